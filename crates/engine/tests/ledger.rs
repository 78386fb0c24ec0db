use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    AllocationShare, CreateExpense, Engine, EngineError, ExpenseListFilter, HouseholdRole,
    PAGE_SIZE, PaymentListFilter, PaymentStatus,
};
use migration::MigratorTrait;

async fn engine_with_users(usernames: &[&str]) -> (Engine, DatabaseConnection) {
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
        .build()
        .await
        .unwrap();
    (engine, db)
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

fn shares(pairs: &[(&str, i64)]) -> Vec<AllocationShare> {
    pairs
        .iter()
        .map(|(user, amount)| AllocationShare {
            user_id: (*user).to_string(),
            amount_minor: *amount,
        })
        .collect()
}

fn expense_cmd(household_id: &str, title: &str) -> CreateExpense {
    CreateExpense {
        household_id: household_id.to_string(),
        actor: "ana".to_string(),
        title: title.to_string(),
        category: None,
        date: Utc::now(),
        amount_minor: 1_000,
        paid: shares(&[("ana", 1_000)]),
        owed: shares(&[("boris", 1_000)]),
    }
}

#[tokio::test]
async fn expense_allocations_must_sum_to_the_amount() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;

    let cmd = CreateExpense {
        owed: shares(&[("boris", 900)]),
        ..expense_cmd(&home, "Broken")
    };
    let err = engine.create_expense(cmd).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("owed allocation must sum to the expense amount".to_string())
    );

    let cmd = CreateExpense {
        paid: shares(&[("ana", 500), ("ana", 500)]),
        ..expense_cmd(&home, "Broken")
    };
    let err = engine.create_expense(cmd).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("duplicate member in paid allocation".to_string())
    );

    let cmd = CreateExpense {
        paid: Vec::new(),
        ..expense_cmd(&home, "Broken")
    };
    assert!(matches!(
        engine.create_expense(cmd).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn expense_allocations_require_household_members() {
    let (engine, _db) = engine_with_users(&["ana", "boris", "stranger"]).await;
    let home = household(&engine, "ana", &["boris"]).await;

    let cmd = CreateExpense {
        owed: shares(&[("stranger", 1_000)]),
        ..expense_cmd(&home, "Broken")
    };
    assert!(matches!(
        engine.create_expense(cmd).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn archived_households_refuse_new_expenses() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;
    engine.archive_household(&home, "ana").await.unwrap();

    let err = engine.create_expense(expense_cmd(&home, "Late")).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("household is archived".to_string())
    );

    // Only an admin can flip the flag back; once restored the ledger opens up again.
    assert!(matches!(
        engine.restore_household(&home, "boris").await,
        Err(EngineError::Forbidden(_))
    ));
    engine.restore_household(&home, "ana").await.unwrap();
    engine
        .create_expense(expense_cmd(&home, "After restore"))
        .await
        .unwrap();
}

#[tokio::test]
async fn expense_lists_are_paged_newest_first() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;

    let base = Utc::now();
    for i in 0..(PAGE_SIZE + 1) {
        let cmd = CreateExpense {
            date: base + Duration::minutes(i as i64),
            ..expense_cmd(&home, &format!("Expense {i}"))
        };
        engine.create_expense(cmd).await.unwrap();
    }

    let filter = ExpenseListFilter::default();
    let first = engine
        .list_expenses(&home, "boris", &filter, 0)
        .await
        .unwrap();
    assert_eq!(first.data.len(), PAGE_SIZE as usize);
    assert!(first.has_more);
    assert_eq!(first.data[0].title, format!("Expense {PAGE_SIZE}"));

    let second = engine
        .list_expenses(&home, "boris", &filter, 1)
        .await
        .unwrap();
    assert_eq!(second.data.len(), 1);
    assert!(!second.has_more);
    assert_eq!(second.data[0].title, "Expense 0");

    // Allocations ride along with every listed expense.
    assert_eq!(first.data[0].paid.len(), 1);
    assert_eq!(first.data[0].owed.len(), 1);
}

#[tokio::test]
async fn expense_filters_narrow_the_list() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;

    let cmd = CreateExpense {
        category: Some("food".to_string()),
        ..expense_cmd(&home, "Groceries")
    };
    engine.create_expense(cmd).await.unwrap();
    let cmd = CreateExpense {
        category: Some("bills".to_string()),
        ..expense_cmd(&home, "Electricity")
    };
    engine.create_expense(cmd).await.unwrap();

    let filter = ExpenseListFilter {
        title: Some("groc".to_string()),
        ..Default::default()
    };
    let page = engine.list_expenses(&home, "ana", &filter, 0).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].title, "Groceries");

    let filter = ExpenseListFilter {
        category: Some("bills".to_string()),
        ..Default::default()
    };
    let page = engine.list_expenses(&home, "ana", &filter, 0).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].title, "Electricity");
}

#[tokio::test]
async fn single_expense_fetch_carries_its_allocations() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;

    let created = engine
        .create_expense(expense_cmd(&home, "Groceries"))
        .await
        .unwrap();

    let fetched = engine.get_expense(&home, created.id, "boris").await.unwrap();
    assert_eq!(fetched.title, "Groceries");
    assert_eq!(fetched.paid.len(), 1);
    assert_eq!(fetched.owed.len(), 1);
    assert_eq!(fetched.owed[0].user_id, "boris");

    assert!(matches!(
        engine
            .get_expense(&home, uuid::Uuid::new_v4(), "boris")
            .await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn an_inverted_date_range_is_rejected() {
    let (engine, _db) = engine_with_users(&["ana"]).await;
    let home = household(&engine, "ana", &[]).await;

    let now = Utc::now();
    let filter = ExpenseListFilter {
        from: Some(now),
        to: Some(now - Duration::days(1)),
        ..Default::default()
    };
    assert!(matches!(
        engine.list_expenses(&home, "ana", &filter, 0).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn payment_lists_honor_the_status_filter() {
    let (engine, _db) = engine_with_users(&["ana", "boris"]).await;
    let home = household(&engine, "ana", &["boris"]).await;

    let cmd = CreateExpense {
        amount_minor: 10_000,
        paid: shares(&[("ana", 10_000)]),
        owed: shares(&[("boris", 10_000)]),
        ..expense_cmd(&home, "Rent")
    };
    engine.create_expense(cmd).await.unwrap();

    let kept = engine
        .propose_payment(&home, "boris", "ana", 2_000, Utc::now())
        .await
        .unwrap();
    let rejected = engine
        .propose_payment(&home, "boris", "ana", 3_000, Utc::now())
        .await
        .unwrap();
    engine
        .reject_payment(&home, rejected.id, "ana", "not yet")
        .await
        .unwrap();

    let filter = PaymentListFilter {
        statuses: Some(vec![PaymentStatus::PendingApproval]),
        ..Default::default()
    };
    let page = engine.list_payments(&home, "ana", &filter, 0).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, kept.id);

    let all = engine
        .list_payments(&home, "ana", &PaymentListFilter::default(), 0)
        .await
        .unwrap();
    assert_eq!(all.data.len(), 2);
}

#[tokio::test]
async fn non_members_cannot_see_the_ledger() {
    let (engine, _db) = engine_with_users(&["ana", "stranger"]).await;
    let home = household(&engine, "ana", &[]).await;

    assert!(matches!(
        engine
            .list_expenses(&home, "stranger", &ExpenseListFilter::default(), 0)
            .await,
        Err(EngineError::KeyNotFound(_))
    ));
}
