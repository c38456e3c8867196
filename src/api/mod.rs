mod qwen;

pub use qwen::QwenClient;
