use clap::{Args, Subcommand};

use super::OutputFormat;
use farmsync::db::AreaRepository;
use farmsync::models::Area;

/// Browse locally synced areas
#[derive(Args)]
pub struct AreasCommand {
    #[command(subcommand)]
    pub command: AreasSubcommand,
}

#[derive(Subcommand)]
pub enum AreasSubcommand {
    /// List synced areas
    List {
        /// Only show areas of this type
        #[arg(long = "type")]
        area_type: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show a single area by its farmOS ID
    Show {
        area_id: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl AreasCommand {
    pub async fn run(&self, repo: &AreaRepository) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AreasSubcommand::List { area_type, format } => {
                let areas = repo.list(area_type.as_deref()).await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&areas)?),
                    OutputFormat::Text => print_table(&areas),
                }
            }
            AreasSubcommand::Show { area_id, format } => {
                let area = repo
                    .get_by_id(*area_id)
                    .await?
                    .ok_or_else(|| format!("Area not found: {}", area_id))?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&area)?),
                    OutputFormat::Text => print_area(&area),
                }
            }
        }
        Ok(())
    }
}

fn print_table(areas: &[Area]) {
    if areas.is_empty() {
        println!("No areas synced yet. Run 'farmsync sync' first.");
        return;
    }

    let name_width = areas
        .iter()
        .map(|a| a.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    println!("{:>6}  {:<name_width$}  TYPE", "ID", "NAME");
    for area in areas {
        println!("{:>6}  {:<name_width$}  {}", area.area_id, area.name, area.area_type);
    }
}

fn print_area(area: &Area) {
    println!("{} (#{})", area.name, area.area_id);
    println!();
    println!(
        "Type:      {}",
        if area.area_type.is_empty() { "-" } else { area.area_type.as_str() }
    );
    println!(
        "Geometry:  {}",
        if area.geom.is_empty() { "-" } else { area.geom.as_str() }
    );
    println!("Synced at: {}", area.synced_at.to_rfc3339());
}
