use mongodb::{
    bson::{doc, Document},
    options::{ClientOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::time::Duration;
use tokio::sync::OnceCell;

pub const INVOICES_COLLECTION: &str = "invoices";

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct Connection {
    client: MongoClient,
    db: Database,
}

/// Lazily connected MongoDB handle.
///
/// The first request that needs the store connects and pings it. A failed
/// attempt leaves the handle unconnected, so a later request tries again.
pub struct MongoDb {
    uri: Option<String>,
    database: String,
    connection: OnceCell<Connection>,
}

impl MongoDb {
    pub fn new(uri: Option<String>, database: impl Into<String>) -> Self {
        Self {
            uri,
            database: database.into(),
            connection: OnceCell::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.uri.is_some()
    }

    pub async fn database(&self) -> Result<&Database, AppError> {
        Ok(&self.connection().await?.db)
    }

    pub async fn invoices(&self) -> Result<Collection<Document>, AppError> {
        Ok(self.database().await?.collection(INVOICES_COLLECTION))
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        let connection = self.connection().await?;
        ping(&connection.client).await
    }

    async fn connection(&self) -> Result<&Connection, AppError> {
        self.connection.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Connection, AppError> {
        let Some(uri) = self.uri.as_deref() else {
            tracing::warn!("MONGO_URI is not set; invoice routes are unavailable");
            return Err(AppError::store_unavailable());
        };

        tracing::info!(database = %self.database, "Connecting to MongoDB");

        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Invalid MongoDB connection string: {}", e);
            AppError::store_unavailable()
        })?;
        options.app_name = Some("invoice-service".to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.connect_timeout = Some(SERVER_SELECTION_TIMEOUT);

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::store_unavailable()
        })?;

        ping(&client).await.map_err(|_| AppError::store_unavailable())?;

        let db = client.database(&self.database);
        initialize_indexes(&db).await;

        tracing::info!(database = %self.database, "Successfully connected to MongoDB database");
        Ok(Connection { client, db })
    }
}

async fn ping(client: &MongoClient) -> Result<(), AppError> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 }, None)
        .await
        .map_err(|e| {
            tracing::error!("MongoDB health check failed: {}", e);
            AppError::from(e)
        })?;
    Ok(())
}

/// Index failures are logged and do not block the connection.
async fn initialize_indexes(db: &Database) {
    let invoices: Collection<Document> = db.collection(INVOICES_COLLECTION);

    let indexes = [
        (doc! { "created_at": -1 }, "created_at_desc"),
        (doc! { "date": 1 }, "date_lookup"),
    ];

    for (keys, name) in indexes {
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().name(name.to_string()).build())
            .build();

        match invoices.create_index(index, None).await {
            Ok(_) => tracing::info!(index = name, "Created index on invoices"),
            Err(e) => tracing::warn!(index = name, "Failed to create index on invoices: {}", e),
        }
    }
}
