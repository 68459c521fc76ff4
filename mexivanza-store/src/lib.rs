pub mod app_config;
pub mod database;
pub mod package_repo;
pub mod availability_repo;
pub mod booking_repo;
pub mod business_repo;
pub mod redis_repo;
pub mod events;
pub mod payment_client;
pub mod memory;

pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use events::EventProducer;
pub use package_repo::StorePackageRepository;
pub use availability_repo::StoreAvailabilityRepository;
pub use booking_repo::StoreBookingRepository;
pub use business_repo::StoreBusinessRepository;
pub use payment_client::RemoteFunctionPaymentAdapter;
