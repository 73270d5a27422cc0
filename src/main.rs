#[macro_use]
extern crate log;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath, TrailingSlash};
use actix_web::{web, App, HttpServer};
use chrono::Utc;
use clap::{Parser, Subcommand};

use beerfest::db::{self, PgStore};
use beerfest::store::Store;
use beerfest::{api, manage, AppState, Result, Settings};

#[derive(Parser)]
#[command(name = "beerfest", version, about = "Beer festival bars, breweries and beers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default).
    Serve,

    /// Apply pending database migrations.
    Migrate,

    /// Create a user account.
    Createuser {
        username: String,

        /// Grant every permission.
        #[arg(long)]
        superuser: bool,

        #[arg(long, env = "BEERFEST_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Grant permissions (e.g. `add_bar change_bar`) to a user.
    Grant {
        username: String,

        #[arg(required = true)]
        permissions: Vec<String>,
    },

    /// Delete expired login sessions.
    Clearsessions,
}

fn cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        return Cors::default();
    }

    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

async fn serve(settings: Settings, store: PgStore) -> Result<()> {
    let listen_addr = settings.listen_addr;
    let origins = settings.allowed_origins.clone();
    let state = web::Data::new(AppState::new(store, settings));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors(&origins))
            .wrap(NormalizePath::new(TrailingSlash::Always))
            .configure(api::configure)
    })
    .bind(listen_addr)?;

    info!("Listening on {}", listen_addr);

    Ok(server.run().await?)
}

fn pg_store(settings: &Settings) -> Result<PgStore> {
    let pool = db::create_pool(settings.database_url()?, settings.pool_size)?;

    Ok(PgStore::new(pool))
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let store = pg_store(&settings)?;
            actix_rt::System::new().block_on(serve(settings, store))
        }
        Command::Migrate => {
            let pool = db::create_pool(settings.database_url()?, 1)?;
            let applied = db::run_migrations(&pool)?;
            if applied.is_empty() {
                info!("No migrations to apply");
            }
            for version in applied {
                info!("Applied migration {}", version);
            }
            Ok(())
        }
        Command::Createuser {
            username,
            superuser,
            password,
        } => {
            manage::create_user(&pg_store(&settings)?, &username, &password, superuser)?;
            Ok(())
        }
        Command::Grant {
            username,
            permissions,
        } => {
            manage::grant(&pg_store(&settings)?, &username, &permissions)?;
            Ok(())
        }
        Command::Clearsessions => {
            let purged = pg_store(&settings)?.purge_sessions(Utc::now())?;
            info!("Deleted {} expired sessions", purged);
            Ok(())
        }
    }
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
