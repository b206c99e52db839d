//! nodeload CLI - Import geospatial datasets into a catalog layer
//!
//! # Main Commands
//!
//! ```bash
//! nodeload import stops.json --id-field id --layer bus.stops ...   # Full pipeline
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! nodeload parse stops.kml          # Just read raw records to JSON
//! nodeload build stops.json ...     # Build nodes without uploading
//! ```

use clap::{Args, Parser, Subcommand};
use nodeload::{
    build_nodes, BuildOptions, BuildReport, CatalogClient, ConfigError, FieldSource, Format,
    GeometrySource, LayerSpec, MappingRules,
};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nodeload")]
#[command(about = "Import geospatial datasets as nodes into a catalog layer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a dataset and output its raw records as JSON
    Parse {
        /// Input file (json, kml, or zipped shapefile)
        input: PathBuf,

        /// Input format (inferred from the extension if not specified)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build nodes from a dataset and output them as JSON
    Build {
        /// Input file (json, kml, or zipped shapefile)
        input: PathBuf,

        /// Input format (inferred from the extension if not specified)
        #[arg(short, long)]
        format: Option<String>,

        #[command(flatten)]
        mapping: MappingArgs,

        /// Abort on the first record that fails to map
        #[arg(long)]
        strict: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full pipeline: build nodes, ensure the layer exists, upload
    Import {
        /// Input file (json, kml, or zipped shapefile)
        input: PathBuf,

        /// Input format (inferred from the extension if not specified)
        #[arg(short, long)]
        format: Option<String>,

        #[command(flatten)]
        mapping: MappingArgs,

        /// Abort on the first record that fails to map
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        target: TargetArgs,

        /// JSON configuration file; fills in options not given on the
        /// command line
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Mapping rule flags shared by `build` and `import`.
#[derive(Args, Clone)]
struct MappingArgs {
    /// Record field holding the node id
    #[arg(long, conflicts_with = "id_value")]
    id_field: Option<String>,

    /// Fixed id for every node
    #[arg(long)]
    id_value: Option<String>,

    /// Record field holding the node name
    #[arg(long, conflicts_with = "name_value")]
    name_field: Option<String>,

    /// Fixed name for every node
    #[arg(long)]
    name_value: Option<String>,

    /// Record field holding the longitude
    #[arg(long, requires = "lat_field", conflicts_with = "native_geometry")]
    lon_field: Option<String>,

    /// Record field holding the latitude
    #[arg(long, requires = "lon_field", conflicts_with = "native_geometry")]
    lat_field: Option<String>,

    /// Use the geometry embedded in the source format (KML, shapefile)
    #[arg(long)]
    native_geometry: bool,

    /// Literal KEY=VALUE pair added to every node's data (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

impl MappingArgs {
    fn into_rules(self) -> Result<MappingRules, ConfigError> {
        let id = field_source(self.id_field, self.id_value);
        let name = field_source(self.name_field, self.name_value);

        let geometry = if self.native_geometry {
            Some(GeometrySource::Native)
        } else {
            match (self.lon_field, self.lat_field) {
                (Some(lon), Some(lat)) => Some(GeometrySource::LatLon { lon, lat }),
                _ => None,
            }
        };

        let mut data = serde_json::Map::new();
        for pair in self.set {
            let (key, value) = pair.split_once('=').ok_or_else(|| ConfigError::InvalidOption {
                option: "--set".to_string(),
                message: format!("expected KEY=VALUE, got '{pair}'"),
            })?;
            data.insert(key.to_string(), Value::String(value.to_string()));
        }

        Ok(MappingRules {
            id,
            name,
            geometry,
            data,
        })
    }
}

fn field_source(field: Option<String>, value: Option<String>) -> Option<FieldSource> {
    // clap rejects the conflicting combination before we get here.
    field
        .map(FieldSource::Field)
        .or(value.map(FieldSource::Value))
}

/// Catalog connection and layer options, mergeable with a JSON config file.
#[derive(Args, Deserialize, Default, Clone)]
struct TargetArgs {
    /// Catalog API base URL
    #[arg(long)]
    url: Option<String>,

    /// Catalog account email (or NODELOAD_EMAIL)
    #[arg(long)]
    email: Option<String>,

    /// Catalog account password (or NODELOAD_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Destination layer name
    #[arg(short, long)]
    layer: Option<String>,

    /// Layer description (used when creating the layer)
    #[arg(long)]
    description: Option<String>,

    /// Layer organization (used when creating the layer)
    #[arg(long)]
    organization: Option<String>,

    /// Layer category (used when creating the layer)
    #[arg(long)]
    category: Option<String>,
}

impl TargetArgs {
    /// Fill in blanks from another set of options.
    fn merge(self, fallback: TargetArgs) -> TargetArgs {
        TargetArgs {
            url: self.url.or(fallback.url),
            email: self.email.or(fallback.email),
            password: self.password.or(fallback.password),
            layer: self.layer.or(fallback.layer),
            description: self.description.or(fallback.description),
            organization: self.organization.or(fallback.organization),
            category: self.category.or(fallback.category),
        }
    }
}

/// Fully resolved import target.
#[derive(Debug)]
struct Target {
    url: String,
    email: String,
    password: String,
    layer: LayerSpec,
}

fn resolve_target(
    args: TargetArgs,
    config: Option<&Path>,
) -> Result<Target, Box<dyn std::error::Error>> {
    let mut args = args;
    if let Some(path) = config {
        let content = fs::read_to_string(path)?;
        let file: TargetArgs = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid config file {}: {}", path.display(), e))?;
        args = args.merge(file);
    }

    let email = args.email.or_else(|| std::env::var("NODELOAD_EMAIL").ok());
    let password = args
        .password
        .or_else(|| std::env::var("NODELOAD_PASSWORD").ok());

    let mut missing = Vec::new();
    let mut require = |name: &'static str, value: &Option<String>| {
        if value.is_none() {
            missing.push(name);
        }
    };
    require("--url", &args.url);
    require("--email", &email);
    require("--password", &password);
    require("--layer", &args.layer);
    require("--description", &args.description);
    require("--organization", &args.organization);
    require("--category", &args.category);

    if !missing.is_empty() {
        return Err(format!("Missing required options: {}", missing.join(", ")).into());
    }

    Ok(Target {
        url: args.url.unwrap_or_default(),
        email: email.unwrap_or_default(),
        password: password.unwrap_or_default(),
        layer: LayerSpec {
            name: args.layer.unwrap_or_default(),
            description: args.description.unwrap_or_default(),
            organization: args.organization.unwrap_or_default(),
            category: args.category.unwrap_or_default(),
        },
    })
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            format,
            output,
        } => cmd_parse(&input, format.as_deref(), output.as_deref()),

        Commands::Build {
            input,
            format,
            mapping,
            strict,
            output,
        } => cmd_build(&input, format.as_deref(), mapping, strict, output.as_deref()),

        Commands::Import {
            input,
            format,
            mapping,
            strict,
            target,
            config,
        } => cmd_import(&input, format.as_deref(), mapping, strict, target, config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn resolve_format(input: &Path, tag: Option<&str>) -> Result<Format, ConfigError> {
    match tag {
        Some(tag) => Format::from_tag(tag),
        None => Format::from_path(input),
    }
}

fn cmd_parse(
    input: &Path,
    format: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = resolve_format(input, format)?;
    eprintln!("📄 Reading {} dataset: {}", format, input.display());

    let records = nodeload::read_records(input, format)?;
    eprintln!("✅ Read {} records", records.len());

    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_build(
    input: &Path,
    format: Option<&str>,
    mapping: MappingArgs,
    strict: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = run_build(input, format, mapping, strict)?;

    let json = serde_json::to_string_pretty(&report.nodes)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_import(
    input: &Path,
    format: Option<&str>,
    mapping: MappingArgs,
    strict: bool,
    target: TargetArgs,
    config: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = resolve_target(target, config)?;
    let report = run_build(input, format, mapping, strict)?;

    if report.nodes.is_empty() {
        return Err("No nodes built, nothing to upload".into());
    }

    eprintln!("🔗 Connecting to catalog: {}", target.url);
    let mut client = CatalogClient::new(&target.url);
    client.authenticate(&target.email, &target.password).await?;

    if client.ensure_layer(&target.layer).await? {
        eprintln!("📦 Layer '{}' created", target.layer.name);
    } else {
        eprintln!("📦 Layer '{}' already exists", target.layer.name);
    }

    eprintln!(
        "⬆️  Uploading {} nodes to '{}'...",
        report.nodes.len(),
        target.layer.name
    );
    client.create_nodes(&target.layer.name, &report.nodes).await?;

    eprintln!("\n✨ Done! {}", report.summary());
    Ok(())
}

/// Shared build step: resolve format and rules, build, report to stderr.
fn run_build(
    input: &Path,
    format: Option<&str>,
    mapping: MappingArgs,
    strict: bool,
) -> Result<BuildReport, Box<dyn std::error::Error>> {
    let format = resolve_format(input, format)?;
    let rules = mapping.into_rules()?;

    eprintln!("📄 Reading {} dataset: {}", format, input.display());
    let report = build_nodes(input, format, &rules, &BuildOptions { strict })?;

    eprintln!("⚙️  Built {} nodes", report.nodes.len());
    if !report.skipped.is_empty() {
        eprintln!("⚠️  Skipped {} records:", report.skipped.len());
        for skip in report.skipped.iter().take(5) {
            eprintln!("   - record {}: {}", skip.index, skip.error);
        }
        if report.skipped.len() > 5 {
            eprintln!("   ... +{} more", report.skipped.len() - 5);
        }
    }

    Ok(report)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_args() -> MappingArgs {
        MappingArgs {
            id_field: None,
            id_value: None,
            name_field: None,
            name_value: None,
            lon_field: None,
            lat_field: None,
            native_geometry: false,
            set: vec![],
        }
    }

    #[test]
    fn test_mapping_args_to_rules() {
        let mut args = mapping_args();
        args.id_field = Some("id".into());
        args.name_value = Some("Bus stops".into());
        args.lon_field = Some("lon".into());
        args.lat_field = Some("lat".into());
        args.set = vec!["source=survey".into()];

        let rules = args.into_rules().unwrap();
        assert_eq!(rules.id, Some(FieldSource::Field("id".into())));
        assert_eq!(rules.name, Some(FieldSource::Value("Bus stops".into())));
        assert_eq!(
            rules.geometry,
            Some(GeometrySource::LatLon {
                lon: "lon".into(),
                lat: "lat".into()
            })
        );
        assert_eq!(rules.data["source"], "survey");
    }

    #[test]
    fn test_native_geometry_flag() {
        let mut args = mapping_args();
        args.id_value = Some("x".into());
        args.native_geometry = true;
        let rules = args.into_rules().unwrap();
        assert_eq!(rules.geometry, Some(GeometrySource::Native));
    }

    #[test]
    fn test_bad_set_pair_rejected() {
        let mut args = mapping_args();
        args.set = vec!["no-equals-sign".into()];
        assert!(args.into_rules().is_err());
    }

    #[test]
    fn test_target_merge_prefers_cli() {
        let cli = TargetArgs {
            url: Some("https://cli.example.org".into()),
            ..Default::default()
        };
        let file = TargetArgs {
            url: Some("https://file.example.org".into()),
            layer: Some("bus.stops".into()),
            ..Default::default()
        };
        let merged = cli.merge(file);
        assert_eq!(merged.url.as_deref(), Some("https://cli.example.org"));
        assert_eq!(merged.layer.as_deref(), Some("bus.stops"));
    }

    #[test]
    fn test_resolve_target_reports_missing_options() {
        let err = resolve_target(TargetArgs::default(), None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("--url"));
        assert!(message.contains("--layer"));
    }
}
