pub mod completion_client;
pub mod llm_service;
pub mod output_validator;
pub mod prompt_builder;
pub mod result_writer;
pub mod schema_mapper;

pub use completion_client::{BackendError, ChatBackend, CompletionClient};
pub use llm_service::LlmService;
pub use output_validator::OutputValidator;
pub use prompt_builder::{Prompt, PromptBuilder};
pub use result_writer::ResultWriter;
pub use schema_mapper::SchemaMapper;
