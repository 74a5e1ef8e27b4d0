mod traits;
pub mod native;
pub mod provider;
pub mod remote;

pub use traits::*;
pub use native::{
    Availability, HostStream, LanguageModelHost, LanguageModelSession, NativeModelProvider,
    SessionOptions,
};
pub use provider::{build_provider, ProviderId};
pub use remote::{render_prompt, RemoteInferenceProvider};
