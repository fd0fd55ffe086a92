use argh::FromArgs;
use uinxsh::session::DEFAULT_PROMPT;
use uinxsh::{Config, Interpreter};

#[derive(FromArgs)]
/// A small Unix shell with pipes, background jobs and fork-join demos.
struct Args {
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// text printed before each input line
    prompt: String,

    #[argh(option, default = "uinxsh::lexer::MAX_LINE")]
    /// longest accepted input line in bytes; longer lines are truncated
    max_line: usize,

    #[argh(option, short = 'c')]
    /// run a single line and exit
    command: Option<String>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    init_tracing();

    let mut sh = Interpreter::new(Config {
        prompt: args.prompt,
        max_line: args.max_line.max(1),
    });

    match args.command {
        Some(line) => sh.cycle(uinxsh::lexer::truncate_line(&line, args.max_line.max(1))),
        None => sh.repl()?,
    }
    Ok(())
}
