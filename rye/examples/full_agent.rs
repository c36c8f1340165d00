//! End-to-end agent thread using Anthropic as the provider.
//!
//! Requires the ANTHROPIC_API_KEY environment variable to be set.
//!
//! Run with:
//!
//! ```sh
//! ANTHROPIC_API_KEY=sk-ant-... cargo run --example full_agent -p rye \
//!     --features "provider-anthropic,checkpoint,budget,transcript,registry-memory"
//! ```

use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use rye::prelude::*;
use rye_budget::InMemoryLedger;
use rye_checkpoint::Checkpointer;
use rye_dispatch::{Dispatcher, ExecutorRegistry, InMemoryItemStore, TrustPolicy};
use rye_provider_anthropic::AnthropicProvider;
use rye_registry_memory::MemoryStore;
use rye_transcript::MemoryTranscript;
use rye_turn::context::NoCompaction;
use rye_turn::RunnerConfig;
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY not set");
    let provider = AnthropicProvider::new(api_key);

    let mut directive = DirectiveSpec::minimal("greet", "Greet {input:name} warmly in one sentence.");
    directive.model = Some("claude-haiku-4-5-20251001".into());
    directive.max_tokens = Some(256);
    directive.max_turns = Some(3);

    let dispatcher = Dispatcher::new(
        InMemoryItemStore::new(),
        ExecutorRegistry::new(),
        HashMap::new(),
        TrustPolicy::default(),
    );

    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let runner = ThreadRunner::new(
        provider,
        dispatcher,
        Vec::new(),
        Box::new(NoCompaction),
        HookRegistry::new(),
        Arc::new(Checkpointer::new(store.clone())),
        Arc::new(InMemoryLedger::new()),
        Arc::new(MemoryTranscript::new()),
        store,
        SigningKey::generate(&mut OsRng),
        directive,
        RunnerConfig::default(),
    );

    let input = ThreadInput {
        directive: rye_core::id::DirectiveId::new("greet"),
        inputs: serde_json::json!({ "name": "Ada" }),
        parent_token: None,
        parent_reservation: None,
        resume_state: None,
    };

    let output = runner.execute(input).await.expect("thread execution failed");
    println!("status: {:?}", output.status);
    println!("turns: {}", output.cost.turns);
    println!("spend: {}", output.cost.spend);
}
