use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use std::io::{self, Write};
use uuid::Uuid;

use crate::canvas::{classify_swipe, Direction};
use crate::config::Config;
use crate::models::{Category, Outfit};
use crate::sync::SyncService;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct OutfitCommand {
    #[command(subcommand)]
    pub command: OutfitSubcommand,
}

#[derive(Subcommand)]
pub enum OutfitSubcommand {
    /// Start an outfit for a date
    Create {
        /// Date the outfit is worn (YYYY-MM-DD)
        date: NaiveDate,
    },

    /// Show an outfit by date
    Show {
        /// Date the outfit is worn (YYYY-MM-DD)
        date: NaiveDate,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List all outfits
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Place a garment on an outfit's canvas
    AddLayer {
        /// Date the outfit is worn (YYYY-MM-DD)
        date: NaiveDate,

        /// Garment ID (UUID)
        garment: Uuid,
    },

    /// Take a garment off an outfit's canvas
    RemoveLayer {
        /// Date the outfit is worn (YYYY-MM-DD)
        date: NaiveDate,

        /// Garment ID (UUID)
        garment: Uuid,
    },

    /// Cycle a category's garments through their slots
    Rotate {
        /// Date the outfit is worn (YYYY-MM-DD)
        date: NaiveDate,

        /// Garment category (head, top, bottom, feet, acc, bag)
        category: String,

        /// Rotation direction (left, right)
        direction: String,
    },

    /// Interpret a drag gesture and rotate if it qualifies as a swipe
    Swipe {
        /// Date the outfit is worn (YYYY-MM-DD)
        date: NaiveDate,

        /// Garment category (head, top, bottom, feet, acc, bag)
        category: String,

        /// Horizontal displacement in percent of canvas width
        #[arg(long)]
        dx: f64,

        /// Vertical displacement in percent of canvas height
        #[arg(long)]
        dy: f64,

        /// Gesture duration in milliseconds
        #[arg(long, default_value = "200")]
        ms: u64,
    },

    /// Delete an outfit
    Delete {
        /// Date the outfit is worn (YYYY-MM-DD)
        date: NaiveDate,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl OutfitCommand {
    pub async fn run(
        &self,
        service: &SyncService,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            OutfitSubcommand::Create { date } => {
                let outfit = Outfit::new(&config.owner_id, *date);
                service.create_outfit(&outfit).await?;
                println!("Created outfit for {}", date);
                println!("  id: {}", outfit.id);
                Ok(())
            }

            OutfitSubcommand::Show { date, format } => {
                let outfit = self.find(service, config, *date).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&outfit)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", outfit);
                    }
                }
                Ok(())
            }

            OutfitSubcommand::List { format } => {
                let outfits = service.outfits().list_by_owner(&config.owner_id).await?;

                if outfits.is_empty() {
                    println!("No outfits found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&outfits)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<12}  LAYERS", "ID", "DATE");
                        println!("{}", "-".repeat(60));
                        for outfit in &outfits {
                            println!(
                                "{:<36}  {:<12}  {}",
                                outfit.id,
                                outfit.date_worn,
                                outfit.layers.len()
                            );
                        }
                        println!("\nTotal: {} outfit(s)", outfits.len());
                    }
                }
                Ok(())
            }

            OutfitSubcommand::AddLayer { date, garment } => {
                let outfit = self.find(service, config, *date).await?;
                let updated = service.add_layer(outfit.id, *garment).await?;
                println!("Placed garment on outfit:");
                println!("{}", updated);
                Ok(())
            }

            OutfitSubcommand::RemoveLayer { date, garment } => {
                let outfit = self.find(service, config, *date).await?;
                let updated = service.remove_layer(outfit.id, *garment).await?;
                println!("Removed garment from outfit:");
                println!("{}", updated);
                Ok(())
            }

            OutfitSubcommand::Rotate {
                date,
                category,
                direction,
            } => {
                let outfit = self.find(service, config, *date).await?;
                let category: Category = category.parse()?;
                let direction: Direction = direction.parse()?;

                let updated = service.rotate_outfit(outfit.id, category, direction).await?;
                println!("Rotated {} layers {}:", category, direction);
                println!("{}", updated);
                Ok(())
            }

            OutfitSubcommand::Swipe {
                date,
                category,
                dx,
                dy,
                ms,
            } => {
                let outfit = self.find(service, config, *date).await?;
                let category: Category = category.parse()?;

                match classify_swipe(*dx, *dy, *ms) {
                    Some(direction) => {
                        let updated =
                            service.rotate_outfit(outfit.id, category, direction).await?;
                        println!("Swipe {} rotated {} layers:", direction, category);
                        println!("{}", updated);
                    }
                    None => {
                        println!("Gesture did not qualify as a swipe; nothing rotated");
                    }
                }
                Ok(())
            }

            OutfitSubcommand::Delete { date, force } => {
                let outfit = self.find(service, config, *date).await?;

                if !force {
                    print!("Delete outfit for {}? [y/N] ", outfit.date_worn);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                service.delete_outfit(outfit.id).await?;
                println!("Deleted outfit for {}", outfit.date_worn);
                Ok(())
            }
        }
    }

    async fn find(
        &self,
        service: &SyncService,
        config: &Config,
        date: NaiveDate,
    ) -> Result<Outfit, Box<dyn std::error::Error>> {
        service
            .outfits()
            .get_by_date(&config.owner_id, date)
            .await?
            .ok_or_else(|| format!("No outfit for {}", date).into())
    }
}
