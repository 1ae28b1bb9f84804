use anyhow::{bail, Result};
use tracing::info;

use crate::{
    cli::SendArgs,
    services::{DeliveryService, IssueSender},
    AppCtx,
};

pub async fn handle(args: SendArgs, ctx: &AppCtx) -> Result<()> {
    if !args.file.is_file() {
        bail!("{} is not a file", args.file.display());
    }

    let settings = ctx.settings()?;
    let delivery = DeliveryService::from_settings(&settings, args.emails)?;

    info!("Sending {} to {}", args.file.display(), delivery.recipients());
    delivery.deliver(&args.file).await
}
