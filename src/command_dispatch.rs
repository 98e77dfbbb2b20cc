//! Purpose: Hold top-level CLI command dispatch for `vitrine`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every document mutation runs admin gate -> edit session -> gateway save.
//! Invariants: Output envelopes and exit code semantics stay stable.

use super::*;

use serde::de::DeserializeOwned;
use serde_json::json;
use super::summary_json::{asset_json, document_summary_json};
use vitrine::api::{
    edit, pick_image, upload_image, AdminGate, ContentDocument, EditSession, Gateway, LoadSource,
    RemoteClient, RemoteSaveState, SaveOutcome, Settings, StylePatch, StyledTextField,
};
use vitrine::notice::{notice_json, Notice};

pub(super) fn dispatch_command(
    command: Command,
    state_dir: PathBuf,
    color_mode: ColorMode,
    overrides: RemoteOverrides,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "vitrine", &mut std::io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Show { summary } => {
            let ctx = Context::open(&state_dir, &overrides)?;
            let loaded = ctx.gateway.load();
            if summary {
                emit_json(
                    json!({ "summary": document_summary_json(&loaded.document, loaded.source) }),
                    color_mode,
                );
            } else {
                let document = serde_json::to_value(&loaded.document).map_err(encode_error)?;
                emit_json(
                    json!({ "source": loaded.source.as_str(), "document": document }),
                    color_mode,
                );
            }
            Ok(RunOutcome::ok())
        }
        Command::Pull => {
            let ctx = Context::open(&state_dir, &overrides)?;
            let loaded = ctx.gateway.load();
            if ctx.gateway.remote_configured() && loaded.source != LoadSource::Remote {
                emit_notice(
                    &ctx,
                    "pull",
                    "remote-unavailable",
                    "remote store did not answer; using the local fallback",
                );
            }
            emit_json(
                json!({ "pulled": document_summary_json(&loaded.document, loaded.source) }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Save => {
            let ctx = Context::open(&state_dir, &overrides)?;
            require_admin(&state_dir)?;
            // Prefer the local working copy; fall back to a full load when
            // nothing has been edited yet.
            let document = match ctx.gateway.cache().read()? {
                Some(document) => document,
                None => ctx.gateway.load().document,
            };
            let session = EditSession::new(document, true);
            let _guard = session.begin_save()?;
            let outcome = ctx.gateway.save(session.document())?;
            report_save(&ctx, "save", &outcome, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Reset { confirm } => {
            require_admin(&state_dir)?;
            if !confirm {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("reset requires --confirm")
                    .with_hint("Reset deletes the local cache and cannot be undone."));
            }
            let ctx = Context::open(&state_dir, &overrides)?;
            let document = ctx.gateway.reset()?;
            emit_json(
                json!({ "reset": document_summary_json(&document, LoadSource::Defaults) }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Export { file } => {
            let ctx = Context::open(&state_dir, &overrides)?;
            let loaded = ctx.gateway.load();
            let bytes = export::export_document(&loaded.document, &file)?;
            emit_json(
                json!({ "exported": { "path": file.display().to_string(), "bytes": bytes } }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Import { file, confirm } => {
            require_admin(&state_dir)?;
            if !confirm {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("import requires --confirm")
                    .with_hint("Import overwrites the current document with the backup file."));
            }
            let ctx = Context::open(&state_dir, &overrides)?;
            let document = export::read_import(&file)?;
            let session = EditSession::new(document, true);
            let _guard = session.begin_save()?;
            let outcome = ctx.gateway.save(session.document())?;
            emit_json(
                json!({
                    "imported": { "path": file.display().to_string() },
                    "saved": save_json(&outcome),
                }),
                color_mode,
            );
            report_local_only(&ctx, "import", &outcome);
            Ok(RunOutcome::ok())
        }
        Command::Admin { command } => match command {
            AdminCommand::Unlock { password } => {
                let ctx = Context::open(&state_dir, &overrides)?;
                let gate = AdminGate::new(ctx.settings.admin_secret.clone());
                if gate.requires_password() && password.is_none() {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("this state directory is password-gated")
                        .with_hint("Pass --password <secret>."));
                }
                gate.unlock(password.as_deref().unwrap_or_default())?;
                write_admin_marker(&state_dir)?;
                emit_json(json!({ "admin": { "unlocked": true } }), color_mode);
                Ok(RunOutcome::ok())
            }
            AdminCommand::Lock => {
                remove_admin_marker(&state_dir)?;
                emit_json(json!({ "admin": { "unlocked": false } }), color_mode);
                Ok(RunOutcome::ok())
            }
            AdminCommand::Status => {
                let ctx = Context::open(&state_dir, &overrides)?;
                let gate = AdminGate::new(ctx.settings.admin_secret.clone());
                emit_json(
                    json!({
                        "admin": {
                            "unlocked": admin_unlocked(&state_dir),
                            "requires_password": gate.requires_password(),
                        }
                    }),
                    color_mode,
                );
                Ok(RunOutcome::ok())
            }
        },
        Command::Site { command } => match command {
            SiteCommand::Create { name } => {
                let ctx = Context::open(&state_dir, &overrides)?;
                let target = ctx.settings.remote_target().ok_or_else(|| {
                    Error::new(ErrorKind::NotConfigured)
                        .with_message("no remote store is configured")
                        .with_hint("Set remote_url in settings.json or pass --remote.")
                })?;
                let mut client = RemoteClient::new(target.base_url)?;
                if let Some(token) = target.token {
                    client = client.with_token(token);
                }
                client.create_site(&name)?;
                emit_json(
                    json!({ "site": { "name": name, "provisioned": true } }),
                    color_mode,
                );
                Ok(RunOutcome::ok())
            }
        },
        Command::Settings { command } => match command {
            SettingsCommand::Show => {
                let ctx = Context::open(&state_dir, &overrides)?;
                let value = serde_json::to_value(&ctx.settings).map_err(encode_error)?;
                emit_json(json!({ "settings": value }), color_mode);
                Ok(RunOutcome::ok())
            }
            SettingsCommand::Set {
                remote_url,
                site,
                token,
                admin_secret,
            } => {
                let mut settings = Settings::load(&state_dir)?;
                if remote_url.is_some() {
                    settings.remote_url = remote_url;
                }
                if site.is_some() {
                    settings.site = site;
                }
                if token.is_some() {
                    settings.token = token;
                }
                if admin_secret.is_some() {
                    settings.admin_secret = admin_secret;
                }
                settings.store(&state_dir)?;
                let value = serde_json::to_value(&settings).map_err(encode_error)?;
                emit_json(json!({ "settings": value }), color_mode);
                Ok(RunOutcome::ok())
            }
        },
        Command::Edit { command } => dispatch_edit(command, state_dir, color_mode, overrides),
        Command::Asset { command } => match command {
            AssetCommand::Upload { file } => {
                require_admin(&state_dir)?;
                let ctx = Context::open(&state_dir, &overrides)?;
                let bytes = read_binary(&file)?;
                let name = file_name(&file)?;
                let asset = ctx.gateway.upload_asset(&bytes, &name)?;
                emit_json(json!({ "asset": asset_json(&asset) }), color_mode);
                Ok(RunOutcome::ok())
            }
            AssetCommand::List => {
                let ctx = Context::open(&state_dir, &overrides)?;
                let assets = ctx.gateway.list_assets()?;
                let out: Vec<_> = assets.iter().map(asset_json).collect();
                emit_json(json!({ "assets": out }), color_mode);
                Ok(RunOutcome::ok())
            }
        },
        Command::Serve { run } => {
            let bind: std::net::SocketAddr = run.bind.parse().map_err(|_| {
                Error::new(ErrorKind::Usage)
                    .with_message("invalid bind address")
                    .with_hint("Use a host:port value like 127.0.0.1:9720.")
            })?;
            let token = resolve_serve_token(run.serve_token, run.token_file)?;
            let config = serve::ServeConfig {
                bind,
                data_dir: run.data_dir.unwrap_or_else(|| state_dir.join("store")),
                token_file_used: token.as_ref().is_some_and(|t| t.from_file),
                token: token.map(|t| t.value),
                access_mode: match run.access {
                    ServeAccess::ReadOnly => serve::AccessMode::ReadOnly,
                    ServeAccess::ReadWrite => serve::AccessMode::ReadWrite,
                },
                allow_non_loopback: run.allow_non_loopback,
                max_body_bytes: run.max_body_bytes,
                cors_allowed_origins: run.cors_origins,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
    }
}

fn dispatch_edit(
    command: EditCommand,
    state_dir: PathBuf,
    color_mode: ColorMode,
    overrides: RemoteOverrides,
) -> Result<RunOutcome, Error> {
    require_admin(&state_dir)?;
    let ctx = Context::open(&state_dir, &overrides)?;
    let loaded = ctx.gateway.load();
    let mut session = EditSession::new(loaded.document, true);

    let next = match command {
        EditCommand::Set { field, value } => {
            edit::set_profile_field(session.document(), field.parse()?, &value)?
        }
        EditCommand::Config { field, value } => {
            edit::set_config_field(session.document(), field.parse()?, &value)?
        }
        EditCommand::Social { field, value } => {
            edit::set_social_field(session.document(), field.parse()?, &value)?
        }
        EditCommand::Highlight { command } => match command {
            ListCommand::Add => edit::add_highlight(session.document())?,
            ListCommand::Remove { index } => edit::remove_highlight(session.document(), index)?,
            ListCommand::Move { index, direction } => {
                edit::move_highlight(session.document(), index, direction.parse()?)?
            }
            ListCommand::Set {
                index,
                field,
                value,
            } => match field.as_str() {
                "text" => edit::set_highlight_text(session.document(), index, &value)?,
                "url" => edit::set_highlight_url(session.document(), index, &value)?,
                other => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message(format!("unknown field `{other}`"))
                        .with_hint("Known fields: text, url."));
                }
            },
        },
        EditCommand::Project { command } => match command {
            ListCommand::Add => edit::add_portfolio_item(session.document())?,
            ListCommand::Remove { index } => {
                edit::remove_portfolio_item(session.document(), index)?
            }
            ListCommand::Move { index, direction } => {
                edit::move_portfolio_item(session.document(), index, direction.parse()?)?
            }
            ListCommand::Set {
                index,
                field,
                value,
            } => edit::set_portfolio_field(session.document(), index, field.parse()?, &value)?,
        },
        EditCommand::Gallery { command } => match command {
            GalleryCommand::Set {
                project,
                index,
                url,
            } => edit::set_gallery_image(session.document(), project, index, &url)?,
            GalleryCommand::Add { project } => {
                edit::add_gallery_image(session.document(), project)?
            }
            GalleryCommand::Remove { project, index } => {
                edit::remove_gallery_image(session.document(), project, index)?
            }
        },
        EditCommand::Nav { command } => match command {
            ListCommand::Add => edit::add_nav_item(session.document())?,
            ListCommand::Remove { index } => edit::remove_nav_item(session.document(), index)?,
            ListCommand::Move { index, direction } => {
                edit::move_nav_item(session.document(), index, direction.parse()?)?
            }
            ListCommand::Set {
                index,
                field,
                value,
            } => edit::set_nav_field(session.document(), index, field.parse()?, &value)?,
        },
        EditCommand::Style { command } => match command {
            StyleCommand::Set {
                key,
                color,
                size,
                font,
                weight,
                italic,
                uppercase,
                align,
                letter_spacing,
            } => {
                let patch = StylePatch {
                    color,
                    size,
                    font: parse_style_enum("--font", font)?,
                    weight: parse_style_enum("--weight", weight)?,
                    italic: parse_style_flag("--italic", italic)?,
                    uppercase: parse_style_flag("--uppercase", uppercase)?,
                    align: parse_style_enum("--align", align)?,
                    letter_spacing,
                };
                if patch == StylePatch::default() {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("no style properties given")
                        .with_hint("Pass at least one property, e.g. --color '#fff'."));
                }
                let mut field = StyledTextField::new(&key);
                field.open_popover(session.field_mode())?;
                field.apply_style(session.document(), &patch)?
            }
            StyleCommand::Clear { key } => edit::clear_text_style(session.document(), &key)?,
        },
        EditCommand::Image {
            target,
            url,
            upload,
            pick,
        } => {
            let target = parse_image_target(&target)?;
            let url = match (url, upload, pick) {
                (Some(url), None, None) => url,
                (None, Some(file), None) => {
                    let bytes = read_binary(&file)?;
                    let name = file_name(&file)?;
                    upload_image(&ctx.gateway, session.field_mode(), &bytes, &name)?
                }
                (None, None, Some(index)) => {
                    pick_image(&ctx.gateway, session.field_mode(), index)?
                }
                _ => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("pass exactly one of --url, --upload, or --pick")
                        .with_hint("Example: vitrine edit image avatar --upload photo.jpg"));
                }
            };
            apply_image_target(session.document(), target, &url)?
        }
    };

    session.commit(next)?;
    let _guard = session.begin_save()?;
    let outcome = ctx.gateway.save(session.document())?;
    emit_json(
        json!({
            "edited": document_summary_json(session.document(), loaded.source),
            "saved": save_json(&outcome),
        }),
        color_mode,
    );
    report_local_only(&ctx, "edit", &outcome);
    Ok(RunOutcome::ok())
}

// --- image targets ---

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ImageTarget {
    Avatar,
    Logo,
    ProjectImage(usize),
    ProjectLogo(usize),
    Gallery(usize, usize),
}

fn parse_image_target(raw: &str) -> Result<ImageTarget, Error> {
    let parts: Vec<&str> = raw.split(':').collect();
    let parsed = match parts.as_slice() {
        ["avatar"] => Some(ImageTarget::Avatar),
        ["logo"] => Some(ImageTarget::Logo),
        ["project", index, "image"] => index.parse().ok().map(ImageTarget::ProjectImage),
        ["project", index, "logo"] => index.parse().ok().map(ImageTarget::ProjectLogo),
        ["gallery", item, image] => match (item.parse().ok(), image.parse().ok()) {
            (Some(item), Some(image)) => Some(ImageTarget::Gallery(item, image)),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("unknown image target `{raw}`"))
            .with_hint(
                "Targets: avatar, logo, project:<i>:image, project:<i>:logo, gallery:<i>:<j>.",
            )
    })
}

fn apply_image_target(
    doc: &ContentDocument,
    target: ImageTarget,
    url: &str,
) -> Result<ContentDocument, Error> {
    match target {
        ImageTarget::Avatar => edit::set_profile_field(doc, edit::ProfileField::AvatarUrl, url),
        ImageTarget::Logo => edit::set_profile_field(doc, edit::ProfileField::LogoImageUrl, url),
        ImageTarget::ProjectImage(index) => {
            edit::set_portfolio_field(doc, index, edit::PortfolioField::ImageUrl, url)
        }
        ImageTarget::ProjectLogo(index) => {
            edit::set_portfolio_field(doc, index, edit::PortfolioField::LogoUrl, url)
        }
        ImageTarget::Gallery(item, image) => edit::set_gallery_image(doc, item, image, url),
    }
}

// --- shared command context ---

struct Context {
    settings: Settings,
    gateway: Gateway,
    site_label: String,
}

impl Context {
    fn open(state_dir: &Path, overrides: &RemoteOverrides) -> Result<Self, Error> {
        let settings = Settings::load(state_dir)?.with_overrides(
            overrides.remote_url.clone(),
            overrides.site.clone(),
            overrides.token.clone(),
        );
        let target = settings.remote_target();
        let site_label = target
            .as_ref()
            .map(|target| target.site.clone())
            .unwrap_or_else(|| "local".to_string());
        let gateway = Gateway::new(state_dir, target)?;
        Ok(Self {
            settings,
            gateway,
            site_label,
        })
    }
}

fn require_admin(state_dir: &Path) -> Result<(), Error> {
    if admin_unlocked(state_dir) {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Permission)
        .with_message("admin mode is locked")
        .with_hint("Run `vitrine admin unlock` first."))
}

fn report_save(ctx: &Context, cmd: &str, outcome: &SaveOutcome, color_mode: ColorMode) {
    emit_json(json!({ "saved": save_json(outcome) }), color_mode);
    report_local_only(ctx, cmd, outcome);
}

fn report_local_only(ctx: &Context, cmd: &str, outcome: &SaveOutcome) {
    if matches!(outcome.remote, RemoteSaveState::NotConfigured) {
        emit_notice(
            ctx,
            cmd,
            "local-only",
            "saved to the local cache only; no remote store is configured",
        );
    }
}

fn emit_notice(ctx: &Context, cmd: &str, kind: &str, message: &str) {
    let notice = Notice {
        kind: kind.to_string(),
        time: now_rfc3339(),
        cmd: cmd.to_string(),
        site: ctx.site_label.clone(),
        message: message.to_string(),
        details: serde_json::Map::new(),
    };
    eprintln!("{}", notice_json(&notice));
}

fn save_json(outcome: &SaveOutcome) -> serde_json::Value {
    let remote = match &outcome.remote {
        RemoteSaveState::Saved(receipt) => json!({
            "site": receipt.site,
            "time": receipt.time,
            "bytes": receipt.bytes,
        }),
        RemoteSaveState::NotConfigured => serde_json::Value::Null,
    };
    json!({ "cached": outcome.cached, "remote": remote })
}

fn parse_style_enum<T: DeserializeOwned>(flag: &str, value: Option<String>) -> Result<Option<T>, Error> {
    let Some(value) = value else {
        return Ok(None);
    };
    serde_json::from_value(serde_json::Value::String(value.clone()))
        .map(Some)
        .map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid value `{value}` for {flag}"))
                .with_hint(format!("Run `vitrine edit style set --help` for the {flag} choices."))
        })
}

fn parse_style_flag(flag: &str, value: Option<String>) -> Result<Option<bool>, Error> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.as_str() {
        "true" | "on" | "yes" => Ok(Some(true)),
        "false" | "off" | "no" => Ok(Some(false)),
        other => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("invalid value `{other}` for {flag}"))
            .with_hint("Use true or false.")),
    }
}

fn resolve_serve_token(
    token: Option<String>,
    token_file: Option<PathBuf>,
) -> Result<Option<ResolvedToken>, Error> {
    match (token, token_file) {
        (Some(_), Some(_)) => Err(Error::new(ErrorKind::Usage)
            .with_message("pass either --serve-token or --token-file, not both")),
        (Some(value), None) => Ok(Some(ResolvedToken {
            value,
            from_file: false,
        })),
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(&path).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read token file")
                    .with_path(&path)
                    .with_source(err)
            })?;
            let value = raw.trim().to_string();
            if value.is_empty() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("token file is empty")
                    .with_path(&path));
            }
            Ok(Some(ResolvedToken {
                value,
                from_file: true,
            }))
        }
        (None, None) => Ok(None),
    }
}

struct ResolvedToken {
    value: String,
    from_file: bool,
}

fn read_binary(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read file")
            .with_path(path)
            .with_source(err)
    })
}

fn file_name(path: &Path) -> Result<String, Error> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("file path has no usable name")
                .with_path(path)
        })
}

fn encode_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to encode json")
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::{parse_image_target, parse_style_flag, ImageTarget};
    use vitrine::api::ErrorKind;

    #[test]
    fn image_targets_parse() {
        assert_eq!(parse_image_target("avatar").expect("t"), ImageTarget::Avatar);
        assert_eq!(parse_image_target("logo").expect("t"), ImageTarget::Logo);
        assert_eq!(
            parse_image_target("project:1:image").expect("t"),
            ImageTarget::ProjectImage(1)
        );
        assert_eq!(
            parse_image_target("project:0:logo").expect("t"),
            ImageTarget::ProjectLogo(0)
        );
        assert_eq!(
            parse_image_target("gallery:1:7").expect("t"),
            ImageTarget::Gallery(1, 7)
        );
        let err = parse_image_target("hero").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = parse_image_target("project:x:image").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn style_flags_parse_booleans() {
        assert_eq!(
            parse_style_flag("--italic", Some("true".to_string())).expect("ok"),
            Some(true)
        );
        assert_eq!(parse_style_flag("--italic", None).expect("ok"), None);
        let err = parse_style_flag("--italic", Some("maybe".to_string())).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
