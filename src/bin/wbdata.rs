use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use wbdata::fetch::default_cache_dir;
use wbdata::{
    CachedFetcher, Climate, ClimateVariable, DateSpec, EntityMapping, Fetch, HttpFetcher,
    Indicators, Interval, Model, Options,
};

#[derive(Parser, Debug)]
#[command(
    name = "wbdata",
    version,
    about = "Query the World Bank Indicators and Climate Data APIs"
)]
struct Cli {
    /// Directory for cached responses (default: <tmp>/wbdata).
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// Always go to the network.
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List metadata codes (indicators, countries, topics, ...).
    Codes(CodesArgs),
    /// Fetch indicator values per country and print them as JSON.
    Get(GetArgs),
    /// Historical climate observations.
    Instrumental(InstrumentalArgs),
    /// Modelled climate projections.
    Modelled(ModelledArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CodeKind {
    Indicators,
    Countries,
    IncomeLevels,
    LendingTypes,
    Regions,
    Topics,
    Sources,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Two-letter language code (e.g., fr, es).
    #[arg(long)]
    language: Option<String>,
    /// Source id (e.g., 2 for WDI). Cannot be combined with --topic.
    #[arg(long)]
    source: Option<String>,
    /// Topic id. Cannot be combined with --source.
    #[arg(long)]
    topic: Option<String>,
    /// Extra API parameter as name=value (repeatable), e.g. --param gapfill=Y
    #[arg(long = "param")]
    params: Vec<String>,
}

#[derive(Args, Debug)]
struct CodesArgs {
    #[arg(value_enum)]
    kind: CodeKind,
    /// Codes separated by comma or semicolon. Default: all.
    #[arg(long)]
    ids: Option<String>,
    /// Keep only entries containing this text (case-insensitive).
    #[arg(long = "match")]
    filter: Option<String>,
    /// Indicators only: keep those featured on data.worldbank.org.
    #[arg(long, default_value_t = false)]
    common_only: bool,
    /// Print the raw records as JSON instead of a code listing.
    #[arg(long, default_value_t = false)]
    json: bool,
    #[command(flatten)]
    query: QueryArgs,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Indicator codes separated by comma or semicolon (e.g., SP.POP.TOTL)
    #[arg(short, long)]
    indicators: String,
    /// Country codes separated by comma or semicolon (e.g., USA,GB). Default: all.
    #[arg(short, long)]
    countries: Option<String>,
    /// Year (YYYY), range (YYYY:YYYY) or API period (e.g., 2012M01:2012M08)
    #[arg(short = 'd', long)]
    date: Option<String>,
    /// Number of most recent values (default 1 when no --date is given).
    #[arg(long)]
    mrv: Option<u32>,
    /// Print indicator and country names instead of the data.
    #[arg(long, default_value_t = false)]
    info: bool,
    #[command(flatten)]
    query: QueryArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VariableArg {
    Pr,
    Tas,
}

impl From<VariableArg> for ClimateVariable {
    fn from(v: VariableArg) -> Self {
        match v {
            VariableArg::Pr => ClimateVariable::Precipitation,
            VariableArg::Tas => ClimateVariable::Temperature,
        }
    }
}

#[derive(Args, Debug)]
struct InstrumentalArgs {
    #[arg(long, value_enum)]
    variable: VariableArg,
    /// Country codes or basin ids separated by comma or semicolon.
    #[arg(short, long)]
    locations: String,
    /// year, month or decade
    #[arg(long, default_value = "year")]
    interval: Interval,
}

#[derive(Args, Debug)]
struct ModelledArgs {
    /// pr, tas, or a derived statistic (e.g., tmin_means) which implies --gcm ensemble.
    #[arg(long)]
    variable: String,
    /// mavg, manom, aavg, aanom, ...
    #[arg(long)]
    data_type: String,
    /// Country codes or basin ids separated by comma or semicolon.
    #[arg(short, long)]
    locations: String,
    /// GCM names separated by comma, or "ensemble". Default: all GCMs.
    #[arg(long)]
    gcm: Option<String>,
    /// Emissions scenario to keep (e.g., a2, b1).
    #[arg(long)]
    scenario: Option<String>,
    /// Ensemble percentiles to keep, separated by comma (e.g., 10,50,90).
    #[arg(long)]
    percentiles: Option<String>,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn as_strs(v: &[String]) -> Vec<&str> {
    v.iter().map(String::as_str).collect()
}

fn build_options(q: &QueryArgs) -> Result<Options> {
    let mut opts = Options::new();
    if let Some(l) = &q.language {
        opts = opts.language(l);
    }
    if let Some(s) = &q.source {
        opts = opts.source(s);
    }
    if let Some(t) = &q.topic {
        opts = opts.topic(t);
    }
    for p in &q.params {
        let Some((name, value)) = p.split_once('=') else {
            bail!("invalid --param {:?}, expected name=value", p);
        };
        opts = opts.set(name.trim(), value.trim());
    }
    Ok(opts)
}

type BoxedFetch = Box<dyn Fn(&str) -> anyhow::Result<String>>;

fn make_fetcher(cli: &Cli) -> Result<BoxedFetch> {
    let http = HttpFetcher::new()?;
    if cli.no_cache {
        return Ok(Box::new(move |u: &str| http.fetch(u)));
    }
    let dir = cli.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let cached = CachedFetcher::new(http, &dir)
        .with_context(|| format!("open cache dir {}", dir.display()))?;
    Ok(Box::new(move |u: &str| cached.fetch(u)))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let fetcher = make_fetcher(&cli)?;
    match &cli.cmd {
        Command::Codes(args) => cmd_codes(Indicators::with_fetcher(fetcher), args),
        Command::Get(args) => cmd_get(Indicators::with_fetcher(fetcher), args),
        Command::Instrumental(args) => cmd_instrumental(Climate::with_fetcher(fetcher), args),
        Command::Modelled(args) => cmd_modelled(Climate::with_fetcher(fetcher), args),
    }
}

fn cmd_codes(client: Indicators<BoxedFetch>, args: &CodesArgs) -> Result<()> {
    let opts = build_options(&args.query)?;
    let ids = args.ids.as_deref().map(parse_list).unwrap_or_default();
    let ids = as_strs(&ids);
    let filter = args.filter.as_deref();
    if args.common_only && !matches!(args.kind, CodeKind::Indicators) {
        bail!("--common-only only applies to indicators");
    }

    let results: EntityMapping = match args.kind {
        CodeKind::Indicators => client.get_indicators(&ids, filter, args.common_only, &opts)?,
        CodeKind::Countries => client.get_countries(&ids, filter, &opts)?,
        CodeKind::IncomeLevels => client.get_income_levels(&ids, filter, &opts)?,
        CodeKind::LendingTypes => client.get_lending_types(&ids, filter, &opts)?,
        CodeKind::Regions => client.get_regions(&ids, filter, &opts)?,
        CodeKind::Topics => client.get_topics(&ids, filter, &opts)?,
        CodeKind::Sources => client.get_sources(&ids, filter, &opts)?,
    };

    if args.json {
        print_json(&results)
    } else {
        wbdata::print_codes(&results, None);
        Ok(())
    }
}

fn cmd_get(client: Indicators<BoxedFetch>, args: &GetArgs) -> Result<()> {
    let mut opts = build_options(&args.query)?;
    if let Some(d) = &args.date {
        opts = opts.date(DateSpec::parse(d));
    }
    if let Some(n) = args.mrv {
        opts = opts.mrv(n);
    }
    let indicators = parse_list(&args.indicators);
    let countries = args.countries.as_deref().map(parse_list).unwrap_or_default();
    if indicators.is_empty() {
        bail!("at least one indicator code required");
    }

    let (data, info) =
        client.get_country_indicators(&as_strs(&indicators), &as_strs(&countries), &opts)?;
    if args.info {
        print!("{}", wbdata::format_info(&info, None));
        Ok(())
    } else {
        print_json(&data)
    }
}

fn cmd_instrumental(client: Climate<BoxedFetch>, args: &InstrumentalArgs) -> Result<()> {
    let locations = parse_list(&args.locations);
    let results =
        client.fetch_instrumental(args.variable.into(), &as_strs(&locations), args.interval)?;
    print_json(&results)
}

fn cmd_modelled(client: Climate<BoxedFetch>, args: &ModelledArgs) -> Result<()> {
    let locations = parse_list(&args.locations);
    let gcms = args.gcm.as_deref().map(parse_list).unwrap_or_default();
    let percentiles = match &args.percentiles {
        Some(p) => parse_list(p)
            .iter()
            .map(|x| x.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid --percentiles, expected numbers like 10,50,90")?,
        None => Vec::new(),
    };
    let scenario = args.scenario.as_deref();

    let results = match args.variable.as_str() {
        "pr" | "tas" => client.fetch_modelled(
            &args.variable,
            &args.data_type,
            &as_strs(&locations),
            &Model::from_names(&as_strs(&gcms)),
            scenario,
            &percentiles,
        )?,
        stat => client.get_derived_stat(
            &args.data_type,
            stat,
            &as_strs(&locations),
            scenario,
            &percentiles,
        )?,
    };
    print_json(&results)
}
