use clap::{Args, Subcommand, ValueEnum};
use std::io::{self, Write};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Category, Garment};
use crate::sync::SyncService;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct GarmentCommand {
    #[command(subcommand)]
    pub command: GarmentSubcommand,
}

#[derive(Subcommand)]
pub enum GarmentSubcommand {
    /// Add a garment to the closet
    Add {
        /// Garment category (head, top, bottom, feet, acc, bag)
        category: String,

        /// Free-form sub-category, e.g. "denim jacket"
        sub_category: String,

        /// Reference to the garment's cut-out image
        #[arg(long)]
        image: Option<String>,
    },

    /// List garments in the closet
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show a garment's details
    Show {
        /// Garment ID (UUID)
        id: Uuid,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a garment
    Delete {
        /// Garment ID (UUID)
        id: Uuid,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl GarmentCommand {
    pub async fn run(
        &self,
        service: &SyncService,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            GarmentSubcommand::Add {
                category,
                sub_category,
                image,
            } => {
                if sub_category.trim().is_empty() {
                    return Err("Sub-category cannot be empty".into());
                }

                let category: Category = category.parse()?;
                let mut garment = Garment::new(&config.owner_id, category, sub_category.trim());
                if let Some(image) = image {
                    garment = garment.with_image_ref(image.as_str());
                }

                service.create_garment(&garment).await?;
                println!("Added garment:");
                println!("{}", garment);
                Ok(())
            }

            GarmentSubcommand::List { format, category } => {
                let garments = service.garments().list_by_owner(&config.owner_id).await?;

                let garments: Vec<_> = if let Some(category) = category {
                    let category: Category = category.parse()?;
                    garments
                        .into_iter()
                        .filter(|g| g.category == category)
                        .collect()
                } else {
                    garments
                };

                if garments.is_empty() {
                    println!("No garments found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&garments)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<8}  SUB-CATEGORY", "ID", "CATEGORY");
                        println!("{}", "-".repeat(70));
                        for garment in &garments {
                            println!(
                                "{:<36}  {:<8}  {}",
                                garment.id, garment.category, garment.sub_category
                            );
                        }
                        println!("\nTotal: {} garment(s)", garments.len());
                    }
                }
                Ok(())
            }

            GarmentSubcommand::Show { id, format } => {
                match service.garments().get_by_id(*id).await? {
                    Some(garment) => {
                        match format {
                            OutputFormat::Json => {
                                println!("{}", serde_json::to_string_pretty(&garment)?);
                            }
                            OutputFormat::Text => {
                                println!("{}", garment);
                            }
                        }
                        Ok(())
                    }
                    None => Err(format!("Garment not found: {}", id).into()),
                }
            }

            GarmentSubcommand::Delete { id, force } => {
                let garment = match service.garments().get_by_id(*id).await? {
                    Some(g) => g,
                    None => return Err(format!("Garment not found: {}", id).into()),
                };

                if !force {
                    print!("Delete garment '{}'? [y/N] ", garment.sub_category);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                service.delete_garment(garment.id).await?;
                println!("Deleted garment: {}", garment.sub_category);
                Ok(())
            }
        }
    }
}
