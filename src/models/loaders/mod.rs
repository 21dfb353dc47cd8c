pub mod csv_loader;
pub mod job_loader;

pub use csv_loader::{load_product_table, parse_product_table};
pub use job_loader::{load_job_file, JobFile};
