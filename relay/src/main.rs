#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod output;

use args::{Args, Command};
use clap::Parser;
use relay_config::Config;
use relay_llm::{AbortRegistration, Adapter, ChatRequest, FimRequest, ListModelsRequest, Message};

use crate::output::TerminalSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    relay_telemetry::init(&args.log, args.log_format)?;

    let config = Config::load(&args.config)?;
    tracing::debug!(config_path = %args.config.display(), "configuration loaded");

    let adapter = Adapter::new(config);

    match args.command {
        Command::Chat {
            provider,
            model,
            system,
            mode,
            reasoning,
            message,
        } => {
            let mut request = ChatRequest::new(provider, model, vec![Message::user(message)])
                .with_tools(mode, Vec::new())
                .with_reasoning(reasoning)
                .with_abort(abort_on_ctrl_c());
            if let Some(system) = system {
                request = request.with_system_message(system);
            }

            let mut sink = TerminalSink::default();
            adapter.send_chat(request, &mut sink).await;
            sink.finish()
        }
        Command::Fim {
            provider,
            model,
            prefix,
            suffix,
            stop,
        } => {
            let request = FimRequest::new(provider, model, prefix, suffix)
                .with_stop(stop)
                .with_abort(abort_on_ctrl_c());

            let mut sink = TerminalSink::default();
            adapter.send_fill_in_middle(request, &mut sink).await;
            sink.finish()
        }
        Command::Models { provider } => {
            let models = adapter.list_models(ListModelsRequest { provider }).await?;
            for model in models {
                match model.owned_by {
                    Some(owner) => println!("{}\t{owner}", model.id),
                    None => println!("{}", model.id),
                }
            }
            Ok(())
        }
    }
}

/// Registration that aborts the request on the first Ctrl-C
fn abort_on_ctrl_c() -> AbortRegistration {
    let (registration, handle) = AbortRegistration::channel();

    tokio::spawn(async move {
        let Ok(handle) = handle.await else {
            return;
        };
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, aborting request");
            handle.abort();
        }
    });

    registration
}
