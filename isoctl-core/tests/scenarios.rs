//! End-to-end scenario runs against a real MySQL server.
//!
//! Run with: DATABASE_URL=mysql://root:pw@localhost/il_levels_demo \
//!     cargo test -p isoctl-core -- --ignored

use std::str::FromStr;
use std::sync::Mutex;

use isoctl_core::config::ChoreographySettings;
use isoctl_core::db::{open_session, AccountRepo};
use isoctl_core::{Anomaly, IsolationLevel, Observation, Runner, Settings};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Executor;

// Scenarios share one table; never run two at once.
static DB_LOCK: Mutex<()> = Mutex::new(());

async fn setup() -> Runner {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let options = MySqlConnectOptions::from_str(&url).expect("bad DATABASE_URL");
    let mut conn = open_session(&options, IsolationLevel::ReadCommitted)
        .await
        .expect("connect failed");
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INT AUTO_INCREMENT PRIMARY KEY,
            account_holder VARCHAR(64) NOT NULL,
            balance DECIMAL(12, 2) NOT NULL
        ) ENGINE = InnoDB",
    )
    .await
    .expect("create table failed");

    let mut settings = Settings::default();
    settings.database.url = Some(url);
    settings.choreography = ChoreographySettings {
        settle_delay_ms: 200,
        signal_timeout_ms: 2000,
    };
    Runner::new(&settings).expect("runner")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires database"]
async fn reset_restores_seed_rows() {
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let runner = setup().await;
    runner.reset().await.expect("reset failed");

    let url = std::env::var("DATABASE_URL").unwrap();
    let options = MySqlConnectOptions::from_str(&url).unwrap();
    let mut conn = open_session(&options, IsolationLevel::ReadCommitted).await.unwrap();
    let mut repo = AccountRepo::new(&mut conn);

    assert_eq!(repo.count_accounts().await.unwrap(), 2);
    assert_eq!(repo.fetch_balance("Alice").await.unwrap(), Some(1000.0));
    assert_eq!(repo.fetch_balance("Bob").await.unwrap(), Some(500.0));
    assert_eq!(repo.fetch_balance("Michael").await.unwrap(), None);
    assert_eq!(repo.sum_balance().await.unwrap(), Some(1500.0));
    assert!(repo.insert("Michael", -1.0).await.is_err());
}

async fn connect() -> MySqlConnection {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let options = MySqlConnectOptions::from_str(&url).expect("bad DATABASE_URL");
    open_session(&options, IsolationLevel::ReadCommitted)
        .await
        .expect("connect failed")
}

async fn exec(conn: &mut MySqlConnection, sql: &str) {
    sqlx::raw_sql(sql)
        .execute(&mut *conn)
        .await
        .unwrap_or_else(|e| panic!("{sql}: {e}"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires database"]
async fn failed_writer_is_reported_and_reader_still_observes() {
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let runner = setup().await;
    let mut conn = connect().await;
    exec(&mut conn, "DROP TRIGGER IF EXISTS accounts_freeze_alice").await;
    exec(
        &mut conn,
        "CREATE TRIGGER accounts_freeze_alice BEFORE UPDATE ON accounts
         FOR EACH ROW BEGIN
             IF OLD.account_holder = 'Alice' THEN
                 SIGNAL SQLSTATE '45000' SET MESSAGE_TEXT = 'Alice is frozen';
             END IF;
         END",
    )
    .await;

    let report = runner
        .run(Anomaly::DirtyRead, IsolationLevel::ReadUncommitted)
        .await;
    exec(&mut conn, "DROP TRIGGER IF EXISTS accounts_freeze_alice").await;
    let report = report.expect("run failed");

    let writer_error = report.writer_error.as_deref().expect("writer should fail");
    assert!(writer_error.contains("Alice is frozen"), "{writer_error}");
    assert!(report.reader_error.is_none(), "{report:?}");
    assert!(!report.succeeded());
    assert_eq!(report.anomaly_observed(), Some(false));

    match &report.observation {
        Some(Observation::DirtyRead(o)) => {
            assert_eq!(o.first_read, 1000.0);
            assert_eq!(o.second_read, 1000.0);
        }
        other => panic!("unexpected observation {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires database"]
async fn failed_reseed_returns_insert_error_and_rolls_back() {
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let runner = setup().await;
    let mut conn = connect().await;
    exec(&mut conn, "DROP TRIGGER IF EXISTS accounts_reject_bob").await;
    exec(
        &mut conn,
        "CREATE TRIGGER accounts_reject_bob BEFORE INSERT ON accounts
         FOR EACH ROW BEGIN
             IF NEW.account_holder = 'Bob' THEN
                 SIGNAL SQLSTATE '45000' SET MESSAGE_TEXT = 'Bob is rejected';
             END IF;
         END",
    )
    .await;

    let result = runner.reset().await;
    exec(&mut conn, "DROP TRIGGER IF EXISTS accounts_reject_bob").await;

    let err = result.expect_err("reset should fail");
    assert!(err.to_string().contains("Bob is rejected"), "{err}");
    // Alice was inserted in the same transaction and must be gone.
    assert_eq!(AccountRepo::new(&mut conn).count_accounts().await.unwrap(), 0);

    runner.reset().await.expect("reset failed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires database"]
async fn dirty_read_only_under_read_uncommitted() {
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let runner = setup().await;
    let report = runner
        .run_scenario(Anomaly::DirtyRead, &Anomaly::DirtyRead.default_levels())
        .await
        .expect("scenario failed");

    assert!(report.succeeded(), "{report:?}");
    assert_eq!(report.runs[0].anomaly_observed(), Some(true));
    assert_eq!(report.runs[1].anomaly_observed(), Some(false));

    match &report.runs[1].observation {
        Some(Observation::DirtyRead(o)) => {
            assert_eq!(o.first_read, 1000.0);
            assert_eq!(o.second_read, 1100.0);
        }
        other => panic!("unexpected observation {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires database"]
async fn non_repeatable_read_prevented_by_repeatable_read() {
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let runner = setup().await;
    let report = runner
        .run_scenario(
            Anomaly::NonRepeatableRead,
            &Anomaly::NonRepeatableRead.default_levels(),
        )
        .await
        .expect("scenario failed");

    assert!(report.succeeded(), "{report:?}");
    assert_eq!(report.runs[0].anomaly_observed(), Some(true));
    assert_eq!(report.runs[1].anomaly_observed(), Some(false));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires database"]
async fn phantom_read_prevented_by_serializable() {
    let _guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let runner = setup().await;
    let report = runner
        .run_scenario(Anomaly::PhantomRead, &Anomaly::PhantomRead.default_levels())
        .await
        .expect("scenario failed");

    assert!(report.succeeded(), "{report:?}");
    assert_eq!(report.runs[0].anomaly_observed(), Some(true));
    assert_eq!(report.runs[1].anomaly_observed(), Some(false));

    match &report.runs[1].observation {
        Some(Observation::PhantomRead(o)) => {
            assert!(o.writer_blocked);
            assert_eq!(o.count, 2);
            assert_eq!(o.average, 750.0);
        }
        other => panic!("unexpected observation {other:?}"),
    }
}
