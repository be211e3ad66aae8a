//! Booking Commands

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Subcommand;
use qakit_client::services::booking::{BookingId, CreatedBooking};
use qakit_client::{ApiResponse, Booking, BookingDates, BookingFilter, BookingService, TokenStore};
use qakit_common::EnvironmentConfig;
use serde::Serialize;
use tracing::{debug, info};

use crate::output::{print_item, print_list, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum BookingCommands {
    /// List booking ids
    List {
        /// Filter by first name
        #[arg(long)]
        firstname: Option<String>,

        /// Filter by last name
        #[arg(long)]
        lastname: Option<String>,

        /// Bookings checking in on or after this date
        #[arg(long)]
        checkin: Option<NaiveDate>,

        /// Bookings checking out on or before this date
        #[arg(long)]
        checkout: Option<NaiveDate>,
    },

    /// Get booking details
    Get {
        /// Booking ID
        id: u64,
    },

    /// Create a booking
    Create {
        #[arg(long)]
        firstname: String,

        #[arg(long)]
        lastname: String,

        /// Total price
        #[arg(long)]
        price: u32,

        #[arg(long)]
        deposit_paid: bool,

        /// Check-in date (YYYY-MM-DD)
        #[arg(long)]
        checkin: NaiveDate,

        /// Check-out date (YYYY-MM-DD)
        #[arg(long)]
        checkout: NaiveDate,

        /// Additional needs
        #[arg(long)]
        needs: Option<String>,
    },

    /// Delete a booking
    Delete {
        /// Booking ID
        id: u64,
    },
}

/// Booking display wrapper for serialization
#[derive(Serialize)]
pub struct BookingDisplay {
    pub id: Option<u64>,
    pub name: String,
    pub total_price: u32,
    pub deposit_paid: bool,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub additional_needs: Option<String>,
}

impl BookingDisplay {
    fn new(id: Option<u64>, booking: Booking) -> Self {
        Self {
            id,
            name: format!("{} {}", booking.firstname, booking.lastname),
            total_price: booking.totalprice,
            deposit_paid: booking.depositpaid,
            checkin: booking.bookingdates.checkin,
            checkout: booking.bookingdates.checkout,
            additional_needs: booking.additionalneeds,
        }
    }
}

impl TableDisplay for BookingDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "Price", "Deposit", "Check-in", "Check-out", "Needs"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.map_or("-".to_string(), |id| id.to_string()),
            self.name.clone(),
            self.total_price.to_string(),
            if self.deposit_paid { "yes" } else { "no" }.to_string(),
            self.checkin.to_string(),
            self.checkout.to_string(),
            self.additional_needs.clone().unwrap_or_default(),
        ]
    }
}

#[derive(Serialize)]
pub struct BookingIdDisplay {
    pub id: u64,
}

impl TableDisplay for BookingIdDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Booking ID"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.id.to_string()]
    }
}

fn ensure_success(response: &ApiResponse, what: &str) -> Result<()> {
    debug!("{} returned {} in {:?}", what, response.status_code(), response.elapsed());
    if !response.is_success() {
        bail!("{} failed with status {}: {}", what, response.status_code(), response.text());
    }
    Ok(())
}

pub async fn execute(cmd: BookingCommands, config: &EnvironmentConfig, format: OutputFormat) -> Result<()> {
    let service = BookingService::from_env(config, TokenStore::new())?;

    match cmd {
        BookingCommands::List {
            firstname,
            lastname,
            checkin,
            checkout,
        } => {
            let filter = BookingFilter {
                firstname,
                lastname,
                checkin,
                checkout,
            };
            let response = service.get_booking_ids(&filter).await?;
            ensure_success(&response, "Listing bookings")?;

            let ids: Vec<BookingId> = response.json()?;
            let displays: Vec<BookingIdDisplay> = ids.into_iter().map(|b| BookingIdDisplay { id: b.bookingid }).collect();
            print_list(&displays, format);
        }

        BookingCommands::Get { id } => {
            let response = service.get_booking(id).await?;
            if response.status_code() == 404 {
                bail!("Booking {} not found", id);
            }
            ensure_success(&response, "Fetching booking")?;
            print_item(&BookingDisplay::new(Some(id), response.json()?), format);
        }

        BookingCommands::Create {
            firstname,
            lastname,
            price,
            deposit_paid,
            checkin,
            checkout,
            needs,
        } => {
            if checkout < checkin {
                bail!("Check-out {} is before check-in {}", checkout, checkin);
            }
            debug!("Authenticating as '{}'", config.credentials.username);
            service
                .authenticate(&config.credentials.username, &config.credentials.password)
                .await?;

            let booking = Booking {
                firstname,
                lastname,
                totalprice: price,
                depositpaid: deposit_paid,
                bookingdates: BookingDates { checkin, checkout },
                additionalneeds: needs,
            };
            let response = service.create_booking(&booking).await?;
            ensure_success(&response, "Creating booking")?;

            let created: CreatedBooking = response.json()?;
            info!("Created booking {}", created.bookingid);
            print_success(&format!("Booking {} created", created.bookingid));
            print_item(&BookingDisplay::new(Some(created.bookingid), created.booking), format);
        }

        BookingCommands::Delete { id } => {
            debug!("Authenticating as '{}'", config.credentials.username);
            service
                .authenticate(&config.credentials.username, &config.credentials.password)
                .await?;
            let response = service.delete_booking(id).await?;
            ensure_success(&response, "Deleting booking")?;
            info!("Deleted booking {}", id);
            print_success(&format!("Booking {} deleted", id));
        }
    }

    Ok(())
}
