use std::collections::HashMap;

use zbus::zvariant::{OwnedValue, Value};

use crate::background::{reset_background, set_background};
use crate::context::{Context, TrackMetadata};
use crate::error::{ArtwallError, ArtwallResult};
use crate::fetch::fetch_art;
use crate::pipeline::process_image;

type PropertiesChangedBody = (String, HashMap<String, OwnedValue>, Vec<String>);

/// Subscribe to MPRIS player property changes and react to track changes
/// until the connection dies.
///
/// Cycle failures are logged and never tear the loop down; only the
/// subscription setup itself is fatal.
pub fn run_loop(ctx: &mut Context) -> ArtwallResult<()> {
    tracing::info!("setting up dbus connection");
    let conn = zbus::blocking::Connection::session()
        .map_err(|e| ArtwallError::resource(format!("dbus session connection failed: {e}")))?;

    let rule = player_match_rule()
        .map_err(|e| ArtwallError::resource(format!("build mpris match rule: {e}")))?;
    let stream = zbus::blocking::MessageIterator::for_match_rule(rule, &conn, None)
        .map_err(|e| ArtwallError::resource(format!("subscribe to mpris signals: {e}")))?;

    tracing::info!("loop is ready");
    for msg in stream {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "dbus read failed");
                continue;
            }
        };
        let (_, changed, _) = match msg.body::<PropertiesChangedBody>() {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unparseable signal");
                continue;
            }
        };
        if let Err(e) = handle_player_update(ctx, &changed) {
            tracing::error!(error = %e, "processing cycle failed");
        }
    }
    Ok(())
}

fn player_match_rule() -> zbus::Result<zbus::MatchRule<'static>> {
    Ok(zbus::MatchRule::builder()
        .msg_type(zbus::MessageType::Signal)
        .interface("org.freedesktop.DBus.Properties")?
        .member("PropertiesChanged")?
        .path("/org/mpris/MediaPlayer2")?
        .arg(0, "org.mpris.MediaPlayer2.Player")?
        .build())
}

/// One full reaction cycle for a player property signal.
fn handle_player_update(
    ctx: &mut Context,
    changed: &HashMap<String, OwnedValue>,
) -> ArtwallResult<()> {
    let status = changed
        .get("PlaybackStatus")
        .and_then(value_to_string)
        .unwrap_or_default();

    let Some(metadata) = changed.get("Metadata").map(parse_metadata) else {
        return Ok(());
    };

    if !track_changed(ctx, &metadata, &status) {
        return Ok(());
    }
    let Some(art_url) = metadata.art_url.clone() else {
        tracing::debug!("can't get art_url");
        return Ok(());
    };

    ctx.last_status = status.clone();
    ctx.metadata = metadata;

    if status != "Playing" {
        reset_background(ctx);
        return Ok(());
    }

    tracing::debug!(url = %art_url, "requesting cover art");
    let image = fetch_art(&art_url)?;

    ctx.reload_screen_size()?;
    if ctx.reload_on_track {
        ctx.reload()?;
    }

    ctx.src_image = Some(image.clone());
    ctx.update_variables()?;

    let Some(processed) = process_image(&image, ctx)? else {
        tracing::debug!("no layers configured, nothing to do");
        return Ok(());
    };

    let out_path = std::env::temp_dir().join("artwall.png");
    processed
        .save(&out_path)
        .map_err(|e| ArtwallError::resource(format!("write wallpaper: {e}")))?;
    set_background(&out_path, ctx)?;
    ctx.previous_image = Some(processed);
    Ok(())
}

/// A cycle runs only when the track id or playback status moved.
fn track_changed(ctx: &Context, metadata: &TrackMetadata, status: &str) -> bool {
    metadata.track_id != ctx.metadata.track_id || status != ctx.last_status
}

fn parse_metadata(raw: &OwnedValue) -> TrackMetadata {
    let Ok(dict) = HashMap::<String, OwnedValue>::try_from(raw.clone()) else {
        return TrackMetadata::default();
    };

    TrackMetadata {
        track_id: dict.get("mpris:trackid").and_then(value_to_string),
        art_url: dict.get("mpris:artUrl").and_then(value_to_string),
        album: dict.get("xesam:album").and_then(value_to_string),
        artists: dict.get("xesam:artist").and_then(value_to_string_vec),
        title: dict.get("xesam:title").and_then(value_to_string),
        track_number: dict.get("xesam:trackNumber").and_then(value_to_i64),
        url: dict.get("xesam:url").and_then(value_to_string),
    }
}

fn value_to_string(v: &OwnedValue) -> Option<String> {
    match &**v {
        Value::Str(s) => Some(s.as_str().to_string()),
        Value::ObjectPath(p) => Some(p.as_str().to_string()),
        _ => None,
    }
}

fn value_to_string_vec(v: &OwnedValue) -> Option<Vec<String>> {
    Vec::<String>::try_from(v.clone()).ok()
}

fn value_to_i64(v: &OwnedValue) -> Option<i64> {
    match &**v {
        Value::I16(n) => Some(i64::from(*n)),
        Value::U16(n) => Some(i64::from(*n)),
        Value::I32(n) => Some(i64::from(*n)),
        Value::U32(n) => Some(i64::from(*n)),
        Value::I64(n) => Some(*n),
        _ => None,
    }
}
