use std::sync::{Arc, Mutex};

use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    AllocationShare, CreateExpense, Engine, EngineError, HouseholdRole, NotificationEvent,
    Publisher, ResourceType,
};
use migration::MigratorTrait;

/// Records every published event; optionally fails every publish.
#[derive(Debug, Default)]
struct RecordingPublisher {
    events: Mutex<Vec<(String, NotificationEvent)>>,
    fail: bool,
}

impl RecordingPublisher {
    fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn recipients(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(recipient, _)| recipient.clone())
            .collect()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, recipient: &str, event: &NotificationEvent) -> Result<(), String> {
        if self.fail {
            return Err("transport down".to_string());
        }
        self.events
            .lock()
            .unwrap()
            .push((recipient.to_string(), event.clone()));
        Ok(())
    }
}

async fn engine_with_publisher(
    usernames: &[&str],
    publisher: Arc<RecordingPublisher>,
) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in usernames {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![(*username).into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .publisher(publisher)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_users(usernames: &[&str]) -> (Engine, DatabaseConnection) {
    engine_with_publisher(usernames, Arc::new(RecordingPublisher::default())).await
}

async fn household(engine: &Engine, admin: &str, members: &[&str]) -> String {
    let household = engine.new_household("Home", admin).await.unwrap();
    for member in members {
        engine
            .add_member(&household.id, admin, member, HouseholdRole::Member)
            .await
            .unwrap();
    }
    household.id
}

async fn seed_debt(engine: &Engine, household_id: &str) {
    engine
        .create_expense(CreateExpense {
            household_id: household_id.to_string(),
            actor: "ana".to_string(),
            title: "Utilities".to_string(),
            category: None,
            date: Utc::now(),
            amount_minor: 10_000,
            paid: vec![AllocationShare {
                user_id: "ana".to_string(),
                amount_minor: 10_000,
            }],
            owed: vec![
                AllocationShare {
                    user_id: "ana".to_string(),
                    amount_minor: 5_000,
                },
                AllocationShare {
                    user_id: "boris".to_string(),
                    amount_minor: 5_000,
                },
            ],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn proposal_notifies_the_payee() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (engine, _db) = engine_with_publisher(&["ana", "boris"], publisher.clone()).await;
    let home = household(&engine, "ana", &["boris"]).await;
    seed_debt(&engine, &home).await;

    let payment = engine
        .propose_payment(&home, "boris", "ana", 5_000, Utc::now())
        .await
        .unwrap();

    let inbox = engine.list_notifications("ana").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].resource_type, ResourceType::Payment);
    assert_eq!(inbox[0].resource_id, payment.id.to_string());
    assert!(!inbox[0].read);

    assert_eq!(publisher.recipients(), vec!["ana".to_string()]);
}

#[tokio::test]
async fn approval_notifies_the_payer_with_the_amount() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;
    seed_debt(&engine, &home).await;

    let payment = engine
        .propose_payment(&home, "boris", "ana", 5_000, Utc::now())
        .await
        .unwrap();
    engine
        .approve_payment(&home, payment.id, "ana")
        .await
        .unwrap();

    let inbox = engine.list_notifications("boris").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message, "Your payment of 50.00 лв. was approved");
}

#[tokio::test]
async fn rejection_notice_carries_the_reason() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;
    seed_debt(&engine, &home).await;

    let payment = engine
        .propose_payment(&home, "boris", "ana", 5_000, Utc::now())
        .await
        .unwrap();
    engine
        .reject_payment(&home, payment.id, "ana", "wrong amount")
        .await
        .unwrap();

    let inbox = engine.list_notifications("boris").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message, "Your payment was rejected: wrong amount");
}

#[tokio::test]
async fn push_failure_still_stores_the_notification() {
    let publisher = Arc::new(RecordingPublisher::failing());
    let (engine, _db) = engine_with_publisher(&["ana", "boris"], publisher).await;
    let home = household(&engine, "ana", &["boris"]).await;
    seed_debt(&engine, &home).await;

    engine
        .propose_payment(&home, "boris", "ana", 5_000, Utc::now())
        .await
        .unwrap();

    let inbox = engine.list_notifications("ana").await.unwrap();
    assert_eq!(inbox.len(), 1);
}

#[tokio::test]
async fn notification_removal_is_owner_only_and_idempotent() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;
    seed_debt(&engine, &home).await;

    engine
        .propose_payment(&home, "boris", "ana", 5_000, Utc::now())
        .await
        .unwrap();
    let inbox = engine.list_notifications("ana").await.unwrap();
    let id = inbox[0].id;

    let err = engine.remove_notification("boris", id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("only the recipient can remove a notification".to_string())
    );

    engine.remove_notification("ana", id).await.unwrap();
    assert!(engine.list_notifications("ana").await.unwrap().is_empty());

    // A second removal of the same id is still a success.
    engine.remove_notification("ana", id).await.unwrap();
}

#[tokio::test]
async fn reminder_notifies_the_receiver() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (engine, _db) = engine_with_publisher(&["ana", "boris"], publisher.clone()).await;
    let home = household(&engine, "ana", &["boris"]).await;

    let reminder = engine
        .create_reminder("ana", "boris", &home, "you owe me for the rent")
        .await
        .unwrap();

    let inbox = engine.list_notifications("boris").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].resource_type, ResourceType::Reminder);
    assert_eq!(inbox[0].resource_id, reminder.id.to_string());
    assert_eq!(publisher.recipients(), vec!["boris".to_string()]);
}

#[tokio::test]
async fn reminders_are_visible_to_both_parties() {
    let (engine, _db) = engine_with_users(&["ana", "boris", "vera"]).await;
    let home = household(&engine, "ana", &["boris", "vera"]).await;

    engine
        .create_reminder("ana", "boris", &home, "rent is due")
        .await
        .unwrap();

    assert_eq!(engine.list_reminders("ana").await.unwrap().len(), 1);
    assert_eq!(engine.list_reminders("boris").await.unwrap().len(), 1);
    assert!(engine.list_reminders("vera").await.unwrap().is_empty());
}

#[tokio::test]
async fn reminder_removal_rules() {
    let (engine, _db) = engine_with_users(&["ana", "boris", "vera"]).await;
    let home = household(&engine, "ana", &["boris", "vera"]).await;

    let reminder = engine
        .create_reminder("ana", "boris", &home, "rent is due")
        .await
        .unwrap();

    let err = engine
        .remove_reminder("vera", reminder.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("only the creator or receiver can remove a reminder".to_string())
    );

    engine.remove_reminder("boris", reminder.id).await.unwrap();
    assert!(engine.list_reminders("ana").await.unwrap().is_empty());

    engine.remove_reminder("boris", reminder.id).await.unwrap();
}

#[tokio::test]
async fn reminder_requires_distinct_members_and_text() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;

    assert!(matches!(
        engine.create_reminder("ana", "ana", &home, "hi").await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.create_reminder("ana", "boris", &home, "  ").await,
        Err(EngineError::Validation(_))
    ));
}
