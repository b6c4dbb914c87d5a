//! Binary entrypoint for the audio conversion service.

use audiocore_app::AppResult;

#[tokio::main]
async fn main() -> AppResult<()> {
    audiocore_app::run_app().await
}
