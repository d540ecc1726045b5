pub mod generate_content;

pub use generate_content::{
    Candidate, Content, FinishReason, GenerateContentRequest, GenerateContentResponse,
    HarmCategory, HarmProbability, Part, PromptFeedback, SafetyRating,
};
