//! Command-line reports against a running weather_station service.
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use weather_station::cache::{FileCache, ResultCache};
use weather_station::clients::{CredentialHolder, StationClient};
use weather_station::config::ClientConfig;
use weather_station::domain::{
    celsius_to_fahrenheit, AnalysisResult, Lookup, Measurement, NoteRequest, WeatherNote,
};
use weather_station::services::TemperatureService;
use weather_station::utils::{month_bounds, parse_day};

#[derive(Debug, Parser)]
#[command(name = "station_report", about = "Weather station readings, trends and notes")]
struct Cli {
    /// Base URL of the station API (overrides STATION_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Newest reading
    Latest,
    /// Readings taken today
    Today,
    /// Statistics over the trailing days
    Analyze {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Statistics over raw samples from the last hours
    Recent {
        #[arg(long, default_value_t = 1)]
        hours: u32,
    },
    /// Latest forecasts
    Predictions {
        #[arg(long, default_value_t = 5)]
        count: u32,
    },
    Login {
        username: String,
        password: String,
    },
    Logout,
    /// Daily notes
    #[command(subcommand)]
    Note(NoteCommand),
}

#[derive(Debug, Subcommand)]
enum NoteCommand {
    Get { date: String },
    /// Notes in a range, the current month by default
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    Add { date: String, content: String },
    Edit { id: i64, content: String },
    Delete { id: i64 },
}

fn day_arg(raw: &str) -> anyhow::Result<NaiveDate> {
    parse_day(raw).with_context(|| format!("invalid date '{}'", raw))
}

fn temp(celsius: f64) -> String {
    format!("{:.1}°C / {:.1}°F", celsius, celsius_to_fahrenheit(celsius))
}

fn print_measurement(m: &Measurement) {
    let fields = m.fields.clone().unwrap_or_default();
    println!("{}", m.timestamp_ms.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  temperature  {}", temp(fields.temperature));
    println!("  humidity     {:.0}%", fields.humidity);
    println!("  dewpoint     {}", temp(fields.dewpoint));
    println!("  pressure     {:.1} hPa", fields.pressure);
    println!(
        "  wind         {:.1} m/s {}",
        fields.wind_speed,
        fields.wind_direction_cardinal.as_deref().unwrap_or("")
    );
    println!("  rain         {:.1} mm", fields.rain);
}

fn print_analysis(result: &AnalysisResult) {
    if !result.success {
        println!(
            "analysis failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        );
        return;
    }
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("{} .. {}", start.format("%Y-%m-%d %H:%M"), end.format("%Y-%m-%d %H:%M"));
    }
    println!("  high         {}", temp(result.highest_temperature));
    println!("  low          {}", temp(result.lowest_temperature));
    println!("  average      {}", temp(result.average_temperature));
    println!("  trend        {:+.1}°C", result.temperature_trend);
    println!(
        "  pressure     {:.1} .. {:.1} hPa (avg {:.1}, trend {:+.1})",
        result.lowest_pressure, result.highest_pressure, result.average_pressure, result.pressure_trend
    );
    println!(
        "  rain         {:.1} mm over {} rainy day(s)",
        result.total_rainfall, result.rainy_days_count
    );
    if let Some(count) = result.measurement_count {
        println!("  samples      {}", count);
    }
    if let Some(rate) = result.sample_rate {
        println!("  sample rate  every {:.1} min", rate);
    }
}

fn print_note(note: &WeatherNote) {
    println!("#{} {}  {}", note.id, note.date, note.content);
}

async fn require_login(client: &StationClient) -> anyhow::Result<()> {
    if !client.credentials().is_authenticated().await {
        anyhow::bail!("not logged in; run `station_report login <username> <password>`");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = if url.ends_with('/') { url } else { format!("{}/", url) };
    }

    let cache_dir = Path::new(&config.cache_dir);
    let credentials = Arc::new(CredentialHolder::persisted(cache_dir.join("session.json")).await?);
    let client = Arc::new(StationClient::new(
        &config.api_url,
        config.fetch_timeout,
        credentials,
    )?);
    let durable = Arc::new(FileCache::open(cache_dir.join("responses")).await?);
    let service = TemperatureService::new(
        client.clone(),
        ResultCache::new(durable, config.fetch_timeout),
    );

    match cli.command {
        Command::Latest => match service.latest().await? {
            Some(m) => print_measurement(&m),
            None => println!("no measurements yet"),
        },
        Command::Today => {
            let today = service.todays_measurements().await?;
            if today.is_empty() {
                println!("no measurements today");
            }
            for m in &today {
                println!(
                    "{}  {}  {:.1} hPa",
                    m.timestamp_ms.format("%H:%M"),
                    temp(m.temperature()),
                    m.pressure()
                );
            }
        }
        Command::Analyze { days } => print_analysis(&service.analyze_window(days).await),
        Command::Recent { hours } => print_analysis(&service.analyze_recent(hours).await),
        Command::Predictions { count } => {
            for p in service.recent_predictions(count).await? {
                println!("{} {} (confidence {})", p.date, p.location, p.confidence_percentage());
                for (label, data) in [("12h", &p.prediction_12h), ("24h", &p.prediction_24h)] {
                    println!(
                        "  {}  temp {} (avg {})  pressure {} hPa",
                        label,
                        data.temperature.range(),
                        temp(data.temperature.average()),
                        data.pressure.range()
                    );
                }
                if !p.reasoning.is_empty() {
                    println!("  {}", p.reasoning);
                }
            }
        }
        Command::Login { username, password } => {
            let credential = client.login(&username, &password).await?;
            println!(
                "logged in as {} until {}",
                credential.username,
                credential.expiration.format("%Y-%m-%d %H:%M UTC")
            );
        }
        Command::Logout => {
            client.logout().await?;
            println!("logged out");
        }
        Command::Note(NoteCommand::Get { date }) => match client.note_by_date(day_arg(&date)?).await {
            Lookup::Found(note) => print_note(&note),
            Lookup::NotFound => println!("no note for {}", date),
            Lookup::Error(e) => anyhow::bail!("could not load note: {}", e),
        },
        Command::Note(NoteCommand::List { from, to }) => {
            let (first, last) = month_bounds(Utc::now().date_naive());
            let start = from.as_deref().map(day_arg).transpose()?.unwrap_or(first);
            let end = to.as_deref().map(day_arg).transpose()?.unwrap_or(last);
            for note in client.notes_in_range(start, end).await? {
                print_note(&note);
            }
        }
        Command::Note(NoteCommand::Add { date, content }) => {
            require_login(&client).await?;
            let note = client
                .create_note(&NoteRequest {
                    date: day_arg(&date)?,
                    content,
                })
                .await?;
            print_note(&note);
        }
        Command::Note(NoteCommand::Edit { id, content }) => {
            require_login(&client).await?;
            print_note(&client.update_note(id, &content).await?);
        }
        Command::Note(NoteCommand::Delete { id }) => {
            require_login(&client).await?;
            client.delete_note(id).await?;
            println!("deleted note #{}", id);
        }
    }

    Ok(())
}
