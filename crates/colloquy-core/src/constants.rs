/// Colloquy centralized constants.
/// Endpoints, prompt-template tokens and defaults live here.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    /// Default model served by the remote inference endpoint
    pub const DEFAULT_REMOTE_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const REMOTE_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co";
    pub const REMOTE_API_KEY_ENV: &str = "HF_TOKEN";
}

// ─── Prompt Template ──────────────────────────────────────────────────────────

pub mod template {
    pub const BEGIN_OF_TEXT: &str = "<|begin_of_text|>";
    pub const START_HEADER: &str = "<|start_header_id|>";
    pub const END_HEADER: &str = "<|end_header_id|>";
    pub const END_OF_TURN: &str = "<|eot_id|>";

    /// Stop sequences sent with every remote generation request
    pub const STOP_SEQUENCES: &[&str] = &[END_OF_TURN, END_HEADER];

    /// Reply used when the endpoint returns no generated text
    pub const EMPTY_REPLY_PLACEHOLDER: &str = "[HF] Nenhuma resposta gerada.";
}

// ─── Default Settings ─────────────────────────────────────────────────────────

pub mod defaults {
    pub const MESSAGE_LIMIT: usize = 10;
    pub const MAX_NEW_TOKENS: u32 = 512;
    pub const SYSTEM_PROMPT_FILE: &str = "llms.txt";
    pub const HISTORY_KEY: &str = "chat_history";
    pub const APP_DIR: &str = "colloquy";
}

// ─── Chat Surface ─────────────────────────────────────────────────────────────

pub mod ui {
    pub const CHATBOT_NAME: &str = "Assistente IA";
    pub const WELCOME_MESSAGE: &str = "👋 Olá! Suas mensagens são salvas automaticamente!";
    /// Greeting shown while the conversation is empty
    pub const FIRST_BOT_MESSAGE: &str = "Olá! Sou seu assistente virtual. Suas mensagens são salvas e você pode continuar nossa conversa mesmo após reiniciar!";
    pub const TYPING_INDICATOR: &str = "Digitando...";
    pub const CLEAR_CONFIRMATION: &str = "Tem certeza que deseja limpar o chat?";
}
