use anyhow::Result;
use tracing::info;

use crate::{cli::ConfigArgs, settings::Settings, AppCtx};

pub async fn handle(args: ConfigArgs, ctx: &AppCtx) -> Result<()> {
    let settings = apply(ctx.settings_store.load()?, args);
    ctx.settings_store.save(&settings)?;
    info!("Configuration saved successfully ✅");
    Ok(())
}

fn apply(mut settings: Settings, args: ConfigArgs) -> Settings {
    if let Some(login) = args.login {
        settings.login = Some(login.as_str().to_string());
    }
    if let Some(server) = args.email_server {
        settings.email_server = Some(server);
    }
    if let Some(port) = args.email_port {
        settings.email_port = Some(port);
    }
    if let Some(sender) = args.email_sender {
        settings.email_sender = Some(sender);
    }
    if let Some(emails) = args.emails {
        settings.emails = Some(emails.to_string());
    }
    if let Some(output_dir) = args.output_dir {
        settings.output_dir = Some(output_dir);
    }
    settings
}
