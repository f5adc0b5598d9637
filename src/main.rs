use anyhow::{Context, Result, anyhow};

use stat_tables::archetype::Archetype;
use stat_tables::config::StatsConfig;
use stat_tables::fetch::{CancelToken, PageSource};
use stat_tables::logging::{init_logging, load_env_files};
use stat_tables::pipeline::StatPipeline;
use stat_tables::resolver::MojangLookup;

fn main() -> Result<()> {
    load_env_files();
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let (archetype, tokens) = parse_args(&args);
    if tokens.is_empty() {
        return Err(anyhow!(
            "usage: stat_tables [--mode=<eight_one|eight_two|four_three|four_four|skywars>] \
             <player>..."
        ));
    }

    let config = StatsConfig::from_env();
    let lookup = MojangLookup::new(&config).context("failed to build identity client")?;
    let source = PageSource::plancke(&config).context("failed to build stat page client")?;
    let pipeline = StatPipeline::new(&config, &lookup, &source);

    if let Some(reply) = pipeline.reply(&tokens, archetype, &CancelToken::new()) {
        println!("{reply}");
    }
    Ok(())
}

fn parse_args(args: &[String]) -> (&'static Archetype, Vec<String>) {
    let mut mode = None;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--mode=") {
            mode = Some(value.trim().to_string());
        } else if arg == "--mode" {
            mode = iter.next().map(|v| v.trim().to_string());
        } else if !arg.trim().is_empty() {
            tokens.push(arg.trim().to_string());
        }
    }
    let archetype = mode
        .as_deref()
        .and_then(Archetype::by_name)
        .unwrap_or_else(|| Archetype::for_mode(mode.as_deref()));
    (archetype, tokens)
}
