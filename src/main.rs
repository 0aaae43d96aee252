// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nomadic Stays command-line client
//!
//! Signs users in with Google or email, lists and registers stays, and
//! books rooms by verifying a UPI payment screenshot.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use nomadic_stays::{
    config::Config,
    error::AppError,
    models::{BookingQuote, RoomType, Stay, StayRegistration},
    services::{AuthState, ImageUpload, OtpDelivery, OtpDispatch, SignUpRequest},
    AppContext,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nomadic")]
#[command(about = "Nomadic Stays client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with an existing Google-linked account
    Login,

    /// Create an account from your Google profile (OTP confirmed)
    Signup,

    /// Create an account with email and password (OTP confirmed)
    RegisterEmail {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },

    /// Sign in with email and password
    SigninEmail {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Forget the local session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Revoke Google access and sign out
    Revoke,

    /// Browse and register stays
    Stays {
        #[command(subcommand)]
        command: StayCommands,
    },

    /// Quote and pay for a booking
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
}

#[derive(Subcommand)]
enum StayCommands {
    /// List approved stays
    List,

    /// List stays registered by the signed-in host
    Mine,

    /// Register a stay from a JSON form
    Register {
        /// JSON file with the registration form
        #[arg(long)]
        form: PathBuf,
        /// Stay photos
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// UPI QR code image
        #[arg(long)]
        upi_qr: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct BookingArgs {
    #[arg(long)]
    stay: String,
    /// `private` or `dorm`
    #[arg(long)]
    room: RoomType,
    #[arg(long, default_value_t = 1)]
    beds: u32,
    /// YYYY-MM-DD
    #[arg(long)]
    check_in: NaiveDate,
    /// YYYY-MM-DD
    #[arg(long)]
    check_out: NaiveDate,
    #[arg(long)]
    guests: Option<u32>,
}

#[derive(Subcommand)]
enum BookCommands {
    /// Price a booking
    Quote(BookingArgs),

    /// Verify a payment screenshot and confirm the booking
    Pay {
        #[command(flatten)]
        booking: BookingArgs,
        /// Screenshot of the UPI payment
        #[arg(long)]
        screenshot: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let ctx = AppContext::init(config).await?;

    let outcome = run(&ctx, cli.command).await;
    ctx.shutdown()?;

    if let Err(e) = outcome {
        tracing::debug!(error = %e, "Command failed");
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(ctx: &AppContext, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Login => {
            let session = ctx.auth.google_sign_in().await?;
            println!("Signed in as {} <{}>", session.name, session.email);
        }
        Commands::Signup => {
            let pending = ctx.auth.google_sign_up_start().await?;
            report_dispatch(&pending.dispatch);
            let code = prompt("Enter the 6-digit code: ").await?;
            let session = ctx.auth.google_sign_up_complete(&pending, &code).await?;
            println!("Welcome, {}! Your account is ready.", session.name);
        }
        Commands::RegisterEmail {
            email,
            name,
            password,
        } => {
            let request = SignUpRequest {
                email,
                password,
                name,
            };
            validator::Validate::validate(&request)?;
            if ctx.auth.check_user_exists(&request.email).await {
                return Err(AppError::AlreadyRegistered(request.email));
            }
            let dispatch = ctx.otp.send(&request.email).await?;
            report_dispatch(&dispatch);
            let code = prompt("Enter the 6-digit code: ").await?;
            ctx.otp.verify(&request.email, &code).await?;
            let session = ctx.auth.sign_up(request).await?;
            println!("Account created successfully! Signed in as {}.", session.name);
        }
        Commands::SigninEmail { email, password } => {
            let session = ctx.auth.sign_in(&email, &password).await?;
            println!("Signed in as {} <{}>", session.name, session.email);
        }
        Commands::Logout => {
            ctx.auth.sign_out()?;
            println!("Signed out.");
        }
        Commands::Whoami => match ctx.auth.auth_state().await {
            AuthState::SignedIn(session) => {
                println!("{} <{}> ({})", session.name, session.email, session.uid)
            }
            AuthState::SignedOut => println!("Not signed in."),
        },
        Commands::Revoke => {
            ctx.auth.revoke_access().await?;
            println!("Google access revoked and signed out.");
        }
        Commands::Stays { command } => run_stays(ctx, command).await?,
        Commands::Book { command } => run_book(ctx, command).await?,
    }
    Ok(())
}

async fn run_stays(ctx: &AppContext, command: StayCommands) -> Result<(), AppError> {
    match command {
        StayCommands::List => {
            for stay in ctx.stays.get_approved_stays().await? {
                print_stay(&stay);
            }
        }
        StayCommands::Mine => {
            let session = ctx
                .auth
                .current_user()
                .ok_or_else(|| AppError::AuthRequired("sign in to see your stays".to_string()))?;
            for stay in ctx.stays.get_host_stays(&session.uid).await? {
                print_stay(&stay);
            }
        }
        StayCommands::Register {
            form,
            images,
            upi_qr,
        } => {
            let raw = tokio::fs::read_to_string(&form)
                .await
                .map_err(|e| AppError::BadRequest(format!("Cannot read {}: {}", form.display(), e)))?;
            let form: StayRegistration = serde_json::from_str(&raw)
                .map_err(|e| AppError::BadRequest(format!("Invalid stay form: {}", e)))?;

            let mut uploads = Vec::with_capacity(images.len());
            for path in &images {
                uploads.push(ImageUpload::from_path(path).await?);
            }
            let qr = match &upi_qr {
                Some(path) => Some(ImageUpload::from_path(path).await?),
                None => None,
            };

            let host_id = ctx.auth.current_user().map(|s| s.uid);
            let registered = ctx
                .stays
                .register_stay(&form, &uploads, qr.as_ref(), host_id.as_deref())
                .await?;

            println!("Stay {} submitted for review.", registered.id);
            let failed = registered.failed_uploads();
            if failed > 0 {
                println!("{} image(s) could not be uploaded and were replaced by placeholders.", failed);
            }
        }
    }
    Ok(())
}

async fn run_book(ctx: &AppContext, command: BookCommands) -> Result<(), AppError> {
    match command {
        BookCommands::Quote(args) => {
            let stay = ctx.stays.get_approved_stay(&args.stay).await?;
            let quote = BookingQuote::compute(&stay, args.room, args.beds, args.check_in, args.check_out)?;
            println!(
                "{} ({} x{}): {} night(s) at {:.2} = {:.2}",
                stay.stay_name, quote.room_type, quote.beds, quote.nights, quote.price_per_night, quote.total_price
            );
        }
        BookCommands::Pay {
            booking: args,
            screenshot,
        } => {
            let stay = ctx.stays.get_approved_stay(&args.stay).await?;
            let quote = BookingQuote::compute(&stay, args.room, args.beds, args.check_in, args.check_out)?;
            let request = quote.into_request(&stay, args.check_in, args.check_out, args.guests);

            let bytes = tokio::fs::read(&screenshot).await.map_err(|e| {
                AppError::BadRequest(format!("Cannot read {}: {}", screenshot.display(), e))
            })?;

            let result = ctx
                .payments
                .verify_payment_screenshot(&STANDARD.encode(bytes), &stay.host_name, &request)
                .await?;

            match result.booking_id {
                Some(id) if result.verified => println!("{} Booking {} confirmed.", result.message, id),
                _ => println!("Payment not verified: {}.", result.message),
            }
        }
    }
    Ok(())
}

fn print_stay(stay: &Stay) {
    let price = |p: Option<f64>| p.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string());
    println!(
        "{}  {} [{}] in {}  private {} / dorm {}  ({})",
        stay.id,
        stay.stay_name,
        stay.stay_type,
        stay.location,
        price(stay.private_room_price),
        price(stay.dorm_price),
        stay.status.trim()
    );
}

fn report_dispatch(dispatch: &OtpDispatch) {
    match &dispatch.delivery {
        OtpDelivery::Sent => println!("A verification code was sent to {}.", dispatch.email),
        OtpDelivery::Failed { code, reason } => {
            tracing::warn!(reason = %reason, "Verification email not delivered");
            println!("Could not email {}. Your verification code is {}.", dispatch.email, code);
        }
    }
}

async fn prompt(label: &str) -> Result<String, AppError> {
    eprint!("{}", label);
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read input: {}", e)))?;
    Ok(line.trim().to_string())
}

/// Initialize logging: flattened JSON with `LOG_FORMAT=json`, compact otherwise.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nomadic_stays=debug,info"));

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        let format = tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .flatten_event(true);
        tracing_subscriber::registry().with(filter).with(format).init();
    } else {
        let format = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry().with(filter).with(format).init();
    }
}
