pub mod conversation;
pub mod inference_service;

pub use conversation::ConversationManager;
pub use inference_service::InferenceService;
