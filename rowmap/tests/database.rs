use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rowmap::{
    params, Database, DatabaseError, DefaultDialect, Driver, FromRow, Parameter, PostgresDialect,
    RawResultSet, Row, SqlValue,
};

/// Driver returning canned rows and recording every execution.
#[derive(Default)]
struct MockDriver {
    result: Mutex<RawResultSet>,
    executed: Mutex<Vec<(String, Vec<SqlValue>)>>,
    fail_with: Option<&'static str>,
}

impl MockDriver {
    fn returning(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        MockDriver {
            result: Mutex::new(RawResultSet {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            }),
            ..Default::default()
        }
    }

    fn failing(message: &'static str) -> Self {
        MockDriver {
            fail_with: Some(message),
            ..Default::default()
        }
    }

    fn executed(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawResultSet, DatabaseError> {
        if let Some(message) = self.fail_with {
            return Err(DatabaseError::Conversion(message.to_string()));
        }
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(self.result.lock().unwrap().clone())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError> {
        if let Some(message) = self.fail_with {
            return Err(DatabaseError::Conversion(message.to_string()));
        }
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }
}

fn database(driver: Arc<MockDriver>) -> Database {
    Database::builder(driver).build()
}

rowmap::db_enum! {
    enum OrderStatus { Pending, Shipped, Delivered }
}

#[tokio::test]
async fn find_all_maps_scalar_rows() {
    let driver = Arc::new(MockDriver::returning(
        &["word"],
        vec![
            vec![SqlValue::Text("bar".to_string())],
            vec![SqlValue::Text("baz".to_string())],
            vec![SqlValue::Text("foo".to_string())],
        ],
    ));
    let db = database(driver);

    let words: Vec<String> = db
        .find_all("select word from dictionary order by word", &[])
        .await
        .unwrap();
    assert_eq!(words, vec!["bar", "baz", "foo"]);
}

#[tokio::test]
async fn find_all_maps_tuples_and_structs() {
    #[derive(Debug, PartialEq)]
    struct Word {
        id: i64,
        word: String,
    }

    impl FromRow for Word {
        fn from_row(row: &Row) -> Result<Self, DatabaseError> {
            Ok(Word {
                id: row.get(0)?,
                word: row.get_by_name("word")?,
            })
        }
    }

    let driver = Arc::new(MockDriver::returning(
        &["id", "word"],
        vec![vec![SqlValue::Int(1), SqlValue::Text("foo".to_string())]],
    ));
    let db = database(driver);

    let pairs: Vec<(i64, String)> = db.find_all("select id, word from w", &[]).await.unwrap();
    assert_eq!(pairs, vec![(1, "foo".to_string())]);

    let words: Vec<Word> = db.find_all("select id, word from w", &[]).await.unwrap();
    assert_eq!(
        words,
        vec![Word {
            id: 1,
            word: "foo".to_string()
        }]
    );
}

#[tokio::test]
async fn find_unique_requires_exactly_one_row() {
    let empty = database(Arc::new(MockDriver::returning(&["n"], vec![])));
    let err = empty.find_unique::<i64>("select n from t", &[]).await.unwrap_err();
    match err {
        DatabaseError::Query { sql, cause } => {
            assert_eq!(sql, "select n from t");
            assert!(matches!(*cause, DatabaseError::EmptyResult));
        }
        other => panic!("expected Query wrapper, got {other}"),
    }

    let two = database(Arc::new(MockDriver::returning(
        &["n"],
        vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]],
    )));
    let err = two.find_unique::<i64>("select n from t", &[]).await.unwrap_err();
    match err {
        DatabaseError::Query { cause, .. } => {
            assert!(matches!(*cause, DatabaseError::NonUniqueResult { count: 2 }));
        }
        other => panic!("expected Query wrapper, got {other}"),
    }
}

#[tokio::test]
async fn find_optional_is_none_on_empty() {
    let db = database(Arc::new(MockDriver::returning(&["n"], vec![])));
    let found: Option<i64> = db.find_optional("select n from t", &[]).await.unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn update_batch_returns_per_statement_counts() {
    let driver = Arc::new(MockDriver::default());
    let db = database(Arc::clone(&driver));

    let counts = db
        .update_batch(
            "insert into dictionary (word) values (?)",
            &[params!["foo"], params!["bar"], params!["baz"]],
        )
        .await
        .unwrap();
    assert_eq!(counts, vec![1, 1, 1]);

    let executed = driver.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed[0].1, vec![SqlValue::Text("foo".to_string())]);
}

#[tokio::test]
async fn errors_reference_the_original_query() {
    let db = database(Arc::new(MockDriver::failing("boom")));
    let err = db
        .update("insert into nonexistent_table (foo) values (?)", &params!["foo"])
        .await
        .unwrap_err();
    match err {
        DatabaseError::Query { sql, .. } => {
            assert_eq!(sql, "insert into nonexistent_table (foo) values (?)");
        }
        other => panic!("expected Query wrapper, got {other}"),
    }
}

#[tokio::test]
async fn registered_native_enum_binds_as_tagged_value() {
    let driver = Arc::new(MockDriver::default());
    let db = Database::builder(Arc::clone(&driver) as Arc<dyn Driver>)
        .dialect(Arc::new(PostgresDialect))
        .configure_conversions(|registry| {
            registry.register_native_enum_conversion::<OrderStatus>("order_status");
        })
        .build();

    db.update(
        "update orders set status = $1",
        &[Parameter::enumeration(OrderStatus::Shipped)],
    )
    .await
    .unwrap();

    let executed = driver.executed();
    match &executed[0].1[0] {
        SqlValue::Enum(tagged) => {
            assert_eq!(tagged.type_name, "order_status");
            assert_eq!(tagged.value, "Shipped");
        }
        other => panic!("expected a tagged enum value, got {other:?}"),
    }
}

#[tokio::test]
async fn unregistered_enum_uses_the_dialect() {
    let driver = Arc::new(MockDriver::default());
    let db = Database::builder(Arc::clone(&driver) as Arc<dyn Driver>)
        .dialect(Arc::new(PostgresDialect))
        .build();

    db.update(
        "update orders set status = $1",
        &[Parameter::enumeration(OrderStatus::Pending)],
    )
    .await
    .unwrap();

    let executed = driver.executed();
    match &executed[0].1[0] {
        SqlValue::Enum(tagged) => {
            // Type name derived mechanically from the enum's simple name.
            assert_eq!(tagged.type_name, "order_status");
            assert_eq!(tagged.value, "Pending");
        }
        other => panic!("expected a tagged enum value, got {other:?}"),
    }
}

#[tokio::test]
async fn enum_falls_back_to_text_without_native_support() {
    let driver = Arc::new(MockDriver::default());
    let db = Database::builder(Arc::clone(&driver) as Arc<dyn Driver>)
        .dialect(Arc::new(DefaultDialect))
        .build();

    db.update(
        "update orders set status = ?",
        &[Parameter::enumeration(OrderStatus::Delivered)],
    )
    .await
    .unwrap();

    let executed = driver.executed();
    assert_eq!(executed[0].1[0], SqlValue::Text("Delivered".to_string()));
}

#[tokio::test]
async fn model_parameters_go_through_registered_conversions() {
    #[derive(Debug, Clone)]
    struct Email(String);

    let driver = Arc::new(MockDriver::default());
    let db = Database::builder(Arc::clone(&driver) as Arc<dyn Driver>)
        .configure_conversions(|registry| {
            registry.register_conversion_to_database(|email: &Email| email.0.clone());
        })
        .build();

    db.update(
        "insert into users (email) values (?)",
        &[Parameter::model(Email("a@b.com".to_string()))],
    )
    .await
    .unwrap();

    let executed = driver.executed();
    assert_eq!(executed[0].1[0], SqlValue::Text("a@b.com".to_string()));
}

#[tokio::test]
async fn model_parameter_without_conversion_is_an_error() {
    #[derive(Debug, Clone)]
    struct Unregistered;

    let db = database(Arc::new(MockDriver::default()));
    let err = db
        .update("insert into t (v) values (?)", &[Parameter::model(Unregistered)])
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NoConversion { .. }));
}

#[tokio::test]
async fn support_trait_assembles_the_database() {
    use rowmap::{DatabaseConfig, DatabaseSupport, TypeConversionRegistry};

    struct AppConfig;

    impl DatabaseSupport for AppConfig {
        fn config(&self) -> DatabaseConfig {
            DatabaseConfig::new("postgres://localhost/app")
        }

        fn register_type_conversions(&self, registry: &mut TypeConversionRegistry) {
            registry.register_conversion_from_database(|stored: &String| stored.len() as i64);
        }
    }

    let driver = Arc::new(MockDriver::returning(
        &["v"],
        vec![vec![SqlValue::Text("abcd".to_string())]],
    ));
    let db = AppConfig.create_database(driver as Arc<dyn Driver>).unwrap();
    assert_eq!(db.dialect().name(), "postgresql");

    let len: i64 = db.find_unique("select v from t", &[]).await.unwrap();
    assert_eq!(len, 4);
}

#[tokio::test]
async fn custom_conversions_flow_into_rows() {
    #[derive(Debug, PartialEq)]
    struct Email(String);

    impl FromRow for Email {
        fn from_row(row: &Row) -> Result<Self, DatabaseError> {
            row.get(0)
        }
    }

    let driver = Arc::new(MockDriver::returning(
        &["email"],
        vec![vec![SqlValue::Text("a@b.com".to_string())]],
    ));
    let db = Database::builder(driver as Arc<dyn Driver>)
        .configure_conversions(|registry| {
            registry.register_conversion_from_database(|stored: &String| Email(stored.clone()));
        })
        .build();

    let email: Email = db.find_unique("select email from users", &[]).await.unwrap();
    assert_eq!(email, Email("a@b.com".to_string()));
}
