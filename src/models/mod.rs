pub mod card;
pub mod generation;
pub mod loaders;
pub mod mapping;
pub mod record;
pub mod result;
pub mod template;

pub use card::{CardField, FieldLimits, GeneratedCard};
pub use generation::{GenerationConfig, ToneOfVoice};
pub use loaders::{load_job_file, load_product_table, parse_product_table, JobFile};
pub use mapping::{Binding, ColumnMapping, MappingRequest};
pub use record::{ProductRecord, ProductTable, RecordIdentity};
pub use result::GenerationResult;
pub use template::PromptTemplate;
