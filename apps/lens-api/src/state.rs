use std::sync::Arc;

use lens_service::LensService;
use lens_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<LensService>,
}
impl AppState {
	pub async fn new(config: lens_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.storage.postgres.vector_dim).await?;

		let service = LensService::new(config, Arc::new(db));

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: LensService) -> Self {
		Self { service: Arc::new(service) }
	}
}
