use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use qris_core::{
    compare_checksums, format_rupiah, probe_variants, render, verify_checksum, DynamicQris,
    GeneratorConfig, QrisPayload, RenderFormat, RenderOptions,
};

#[derive(Parser)]
#[command(name = "qris", about = "Inspect static QRIS payloads and generate dynamic ones")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed an amount into a static payload.
    Generate(GenerateArgs),
    /// Parse a payload and print its fields.
    Inspect(InspectArgs),
    /// Check the trailing CRC field.
    Verify(PayloadArgs),
    /// Recompute the trailing CRC with every known CRC16 variant.
    ProbeCrc(InspectArgs),
    /// Render a payload as a QR image.
    Render(RenderArgs),
}

#[derive(Args)]
struct PayloadArgs {
    /// Payload string. Read from --file or stdin when omitted.
    payload: Option<String>,
    /// File holding the payload.
    #[arg(long, conflicts_with = "payload")]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    input: PayloadArgs,
    /// Amount in whole Rupiah.
    #[arg(long, allow_negative_numbers = true)]
    amount: i64,
    /// Refuse a static payload whose own checksum is wrong.
    #[arg(long)]
    strict: bool,
    /// Do not fall back to tag 59 when tag 58 is missing.
    #[arg(long)]
    no_merchant_name_anchor: bool,
    /// Print a comparison with the static payload.
    #[arg(long)]
    compare: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    input: PayloadArgs,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Png,
    Svg,
    Terminal,
}

impl From<OutputFormat> for RenderFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Png => RenderFormat::Png,
            OutputFormat::Svg => RenderFormat::Svg,
            OutputFormat::Terminal => RenderFormat::Terminal,
        }
    }
}

#[derive(Args)]
struct RenderArgs {
    #[command(flatten)]
    input: PayloadArgs,
    /// Output file. Terminal output goes to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    format: OutputFormat,
    /// Minimum image size in pixels.
    #[arg(long, default_value_t = 320)]
    size: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Inspect(args) => inspect(args),
        Commands::Verify(args) => verify(args),
        Commands::ProbeCrc(args) => probe_crc(args),
        Commands::Render(args) => render_cmd(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn read_payload(args: &PayloadArgs) -> Result<String> {
    let raw = match (&args.payload, &args.file) {
        (Some(payload), _) => payload.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read payload from {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read payload from stdin")?;
            buf
        }
    };
    let payload = raw.trim().to_string();
    if payload.is_empty() {
        bail!("empty payload");
    }
    Ok(payload)
}

fn generate(args: GenerateArgs) -> Result<()> {
    let static_payload = read_payload(&args.input)?;
    let generator = DynamicQris::with_config(GeneratorConfig {
        verify_input_checksum: args.strict,
        allow_merchant_name_anchor: !args.no_merchant_name_anchor,
    });

    let dynamic = generator
        .generate(&static_payload, args.amount)
        .with_context(|| format!("failed to generate payload for {}", format_rupiah(args.amount)))?;
    println!("{dynamic}");

    if args.compare {
        let report = compare_checksums(&static_payload, &dynamic);
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<()> {
    let payload = read_payload(&args.input)?;
    let parsed = QrisPayload::parse(&payload).context("failed to parse payload")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!("Length:            {}", payload.len());
    println!("Initiation:        {:?}", parsed.point_of_initiation);
    for (tag, fields) in &parsed.merchant_account_information {
        let id = fields.get("00").map(String::as_str).unwrap_or("-");
        println!("Merchant account:  {tag} {id}");
    }
    println!("MCC:               {}", parsed.merchant_category_code.as_deref().unwrap_or("-"));
    println!(
        "Currency:          {} ({})",
        parsed.transaction_currency.as_deref().unwrap_or("-"),
        parsed.currency_alpha().unwrap_or("?")
    );
    match parsed.transaction_amount {
        Some(amount) => println!("Amount:            {}", format_rupiah(amount)),
        None => println!("Amount:            - (static)"),
    }
    println!("Country:           {}", parsed.country_code.as_deref().unwrap_or("-"));
    println!("Merchant:          {}", parsed.merchant_name.as_deref().unwrap_or("-"));
    println!("City:              {}", parsed.merchant_city.as_deref().unwrap_or("-"));
    println!("CRC:               {}", parsed.crc);
    Ok(())
}

fn verify(args: PayloadArgs) -> Result<()> {
    let payload = read_payload(&args)?;
    verify_checksum(&payload).context("checksum verification failed")?;
    println!("OK {}", &payload[payload.len() - 4..]);
    Ok(())
}

fn probe_crc(args: InspectArgs) -> Result<()> {
    let payload = read_payload(&args.input)?;
    let results = probe_variants(&payload);
    if results.is_empty() {
        bail!("payload too short or not ASCII");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("Provided: {}", &payload[payload.len() - 4..]);
    for result in &results {
        let mark = if result.matches { "MATCH" } else { "" };
        println!("{:<24} {} {}", result.variant.name(), result.computed, mark);
    }
    Ok(())
}

fn render_cmd(args: RenderArgs) -> Result<()> {
    let payload = read_payload(&args.input)?;
    let options = RenderOptions {
        size: args.size,
        format: args.format.into(),
        ..RenderOptions::default()
    };
    let bytes = render(&payload, &options).context("failed to render payload")?;

    match (&args.out, args.format) {
        (Some(path), _) => {
            fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        (None, OutputFormat::Png) => bail!("--out is required for PNG output"),
        (None, _) => print!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}
