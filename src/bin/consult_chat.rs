use clap::Parser;
use consult_agent::client::session::ChatSession;
use consult_agent::client::ConsultClient;
use consult_agent::config::prompt::PromptConfig;
use dotenv::dotenv;
use std::error::Error;
use std::io::{ self, BufRead, Write };

#[derive(Parser, Debug)]
#[command(version, about = "Terminal chat client for a running consult-agent server")]
struct ClientArgs {
    /// Base URL of the consult-agent server.
    #[arg(long, env = "CONSULT_URL", default_value = "http://127.0.0.1:4000")]
    url: String,

    /// Request the reply as one JSON body instead of a simulated stream.
    #[arg(long, default_value = "false")]
    batch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = ClientArgs::parse();

    let client = ConsultClient::new(&args.url);
    let prompts = PromptConfig::default();
    let mut session = ChatSession::new(Some(prompts.greeting.clone()));

    println!("assistant> {}", prompts.greeting);
    println!("(/new starts a fresh consultation, /quit exits)");

    let stdin = io::stdin();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);

        match line {
            "/quit" => {
                break;
            }
            "/new" => {
                session.reset();
                println!("assistant> {}", prompts.greeting);
                continue;
            }
            _ => {}
        }

        session.set_input(line);
        let Some((messages, stream_id)) = session.submit() else {
            continue;
        };

        if args.batch {
            // one assistant message either way: the reply, or the error text
            let text = match client.consult(&messages).await {
                Ok(text) => text,
                Err(err) => format!("The medical assistant is currently unavailable: {}", err),
            };
            println!("assistant> {}", text);
            session.complete(stream_id, text);
        } else {
            let placeholder = session.push_placeholder();
            print!("assistant> ");
            io::stdout().flush()?;

            let result = client.consult_stream(&messages, |chunk| {
                print!("{}", chunk);
                let _ = io::stdout().flush();
                session.append_chunk(stream_id, placeholder, chunk);
            }).await;

            println!();
            match result {
                Ok(()) => session.finish(stream_id),
                Err(err) => {
                    let text = format!("The medical assistant is currently unavailable: {}", err);
                    println!("assistant> {}", text);
                    session.fail_stream(stream_id, placeholder, text);
                }
            }
        }
    }

    Ok(())
}
