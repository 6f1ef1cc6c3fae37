mod cli;
mod infra;
mod routes;
mod server;
mod slips;

use condo_billing::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
