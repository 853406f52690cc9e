use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lens_api::Args::parse();

	lens_api::run(args).await
}
