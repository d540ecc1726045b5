pub(crate) const PROVIDER_ID: &str = "gemini-web";
pub(crate) const PROVIDER_LABEL: &str = "Gemini Web";

pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=utf-8";
pub(crate) const ORIGIN: &str = "https://gemini.google.com";
pub(crate) const REFERER: &str = "https://gemini.google.com/";
pub(crate) const UPLOAD_PUSH_ID: &str = "feeds/mcudyrk2a4khkz";
pub(crate) const MODEL_HEADER: &str = "x-goog-ext-525001261-jspb";

/// Landing page written when token extraction fails and debugging is on.
pub(crate) const DEBUG_INIT_HTML: &str = "debug-gemini-init.html";

/// Backend mode id per public model id.
const MODEL_MODE_IDS: [(&str, &str); 3] = [
    ("gemini-3.0-pro", "9d8ca3786ebdfbea"),
    ("gemini-2.5-pro", "4af6c7f5da75d65d"),
    ("gemini-2.5-flash", "9ec249fc9ad08861"),
];

/// Value of [`MODEL_HEADER`] selecting `model`, if the backend knows it.
pub(crate) fn model_header_value(model: &str) -> Option<String> {
    MODEL_MODE_IDS
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, mode)| format!("[1,null,null,null,\"{mode}\",null,null,0,[4]]"))
}

/// Remote endpoints. Overridable so the client can be pointed at a local
/// stand-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiEndpoints {
    pub warmup: String,
    pub init: String,
    pub generate: String,
    pub upload: String,
}

impl Default for GeminiEndpoints {
    fn default() -> Self {
        Self {
            warmup: "https://www.google.com".to_string(),
            init: "https://gemini.google.com/app".to_string(),
            generate: "https://gemini.google.com/_/BardChatUi/data/assistant.lamda.BardFrontendService/StreamGenerate".to_string(),
            upload: "https://content-push.googleapis.com/upload".to_string(),
        }
    }
}

impl GeminiEndpoints {
    /// All endpoints under one base URL: `/warmup`, `/app`, `/generate`, `/upload`.
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            warmup: format!("{base}/warmup"),
            init: format!("{base}/app"),
            generate: format!("{base}/generate"),
            upload: format!("{base}/upload"),
        }
    }
}
