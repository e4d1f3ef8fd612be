use std::collections::BTreeMap;

use image::RgbaImage;
use rayon::prelude::*;

use crate::composite::{centered_offset, composite_at};
use crate::config::{Layer, LayerId, ProcessorCall};
use crate::context::Context;
use crate::error::{ArtwallError, ArtwallResult};
use crate::processors::ProcessorArgs;
use crate::template::{self, VarSet};

/// Run one layer's processor chain over a copy of the source image.
///
/// Processors apply in declaration order, each consuming the previous
/// output. String arguments are template-substituted against the live
/// variable set before dispatch; coercion stays with the processor.
pub fn process_layer(
    image: RgbaImage,
    ctx: &Context,
    layer: &Layer,
) -> ArtwallResult<(LayerId, RgbaImage)> {
    let mut image = image;
    for call in &layer.processors {
        let processor = ctx.processors().get(&call.name)?;
        tracing::debug!(processor = %call.name, layer = %layer.name, "applying processor");
        let args = resolve_args(call, &ctx.variables)?;
        image = processor(image, &args)?;
    }
    Ok((layer.name.clone(), image))
}

/// Process every configured layer and composite the results.
///
/// Returns `None` when no layers are configured. Layers run concurrently
/// (they share nothing but the read-only context); compositing follows the
/// configured blend order, or declaration order when `blender` is empty,
/// centering each layer on a transparent canvas sized to the screen.
#[tracing::instrument(skip_all)]
pub fn process_image(image: &RgbaImage, ctx: &Context) -> ArtwallResult<Option<RgbaImage>> {
    if ctx.config.layers.is_empty() {
        return Ok(None);
    }

    let blend_order: Vec<LayerId> = if ctx.config.blender.is_empty() {
        ctx.config.layers.iter().map(|l| l.name.clone()).collect()
    } else {
        ctx.config.blender.clone()
    };

    let rendered = ctx
        .config
        .layers
        .par_iter()
        .map(|layer| process_layer(image.clone(), ctx, layer))
        .collect::<ArtwallResult<Vec<_>>>()?;
    let by_name: BTreeMap<LayerId, RgbaImage> = rendered.into_iter().collect();

    let (cw, ch) = (ctx.screen.width, ctx.screen.height);
    let mut canvas = RgbaImage::new(cw, ch);
    for name in &blend_order {
        let overlay = by_name.get(name).ok_or_else(|| {
            ArtwallError::config(format!("blend layer '{name}' is not defined"))
        })?;

        let (ow, oh) = overlay.dimensions();
        if ow > cw || oh > ch {
            return Err(ArtwallError::resource(format!(
                "layer '{name}' ({ow}x{oh}) is bigger than the biggest screen ({cw}x{ch})"
            )));
        }

        let (x, y) = centered_offset((cw, ch), (ow, oh));
        composite_at(&mut canvas, overlay, x, y)?;
    }
    Ok(Some(canvas))
}

fn resolve_args(call: &ProcessorCall, vars: &VarSet) -> ArtwallResult<ProcessorArgs> {
    let Some(raw) = &call.args else {
        return Ok(ProcessorArgs::empty());
    };

    let mut resolved = BTreeMap::new();
    for (name, value) in raw {
        let rendered = match value {
            serde_json::Value::String(s) => template::substitute(s, vars)?,
            other => template::render_value(other),
        };
        resolved.insert(name.clone(), rendered);
    }
    Ok(ProcessorArgs::from_map(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::Screen;

    fn call(name: &str, args: &[(&str, serde_json::Value)]) -> ProcessorCall {
        ProcessorCall {
            name: name.to_string(),
            args: if args.is_empty() {
                None
            } else {
                Some(
                    args.iter()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .collect(),
                )
            },
        }
    }

    fn layer(name: &str, processors: Vec<ProcessorCall>) -> Layer {
        Layer {
            name: LayerId::from(name),
            processors,
        }
    }

    fn ctx_with_layers(layers: Vec<Layer>, blender: Vec<LayerId>, screen: Screen) -> Context {
        let config = Config {
            layers,
            blender,
            ..Config::default()
        };
        let mut ctx = Context::with_config(config, screen);
        ctx.update_variables().unwrap();
        ctx
    }

    #[test]
    fn args_substitute_variables_and_stringify_numbers() {
        let mut vars = VarSet::new();
        vars.insert("screen".to_string(), serde_json::json!({"width": 640}));

        let c = call(
            "resize",
            &[
                ("width", serde_json::json!("{screen.width}")),
                ("height", serde_json::json!(480)),
            ],
        );
        let args = resolve_args(&c, &vars).unwrap();
        assert_eq!(args.get("width"), Some("640"));
        assert_eq!(args.get("height"), Some("480"));
    }

    #[test]
    fn unresolved_variable_fails_the_layer() {
        let ctx = ctx_with_layers(
            vec![layer(
                "bg",
                vec![call("resize", &[("width", serde_json::json!("{missing_var}"))])],
            )],
            vec![],
            Screen::default(),
        );
        let err = process_layer(RgbaImage::new(4, 4), &ctx, &ctx.config.layers[0]).unwrap_err();
        assert!(err.to_string().contains("{missing_var}"));
    }

    #[test]
    fn unknown_processor_fails_the_layer() {
        let ctx = ctx_with_layers(
            vec![layer("bg", vec![call("warp", &[])])],
            vec![],
            Screen::default(),
        );
        let err = process_layer(RgbaImage::new(4, 4), &ctx, &ctx.config.layers[0]).unwrap_err();
        assert!(err.to_string().contains("unknown processor 'warp'"));
    }

    #[test]
    fn empty_blender_uses_declaration_order() {
        // Two full-canvas opaque layers: the later declared one must win.
        let screen = Screen {
            width: 8,
            height: 8,
        };
        let ctx = ctx_with_layers(
            vec![
                layer(
                    "under",
                    vec![call(
                        "blank_img",
                        &[
                            ("width", serde_json::json!("8")),
                            ("height", serde_json::json!("8")),
                            ("color", serde_json::json!("#ff0000")),
                        ],
                    )],
                ),
                layer(
                    "over",
                    vec![call(
                        "blank_img",
                        &[
                            ("width", serde_json::json!("8")),
                            ("height", serde_json::json!("8")),
                            ("color", serde_json::json!("#0000ff")),
                        ],
                    )],
                ),
            ],
            vec![],
            screen,
        );

        let out = process_image(&RgbaImage::new(1, 1), &ctx).unwrap().unwrap();
        assert_eq!(out.get_pixel(4, 4).0, [0, 0, 255, 255]);
    }

    #[test]
    fn blender_order_overrides_declaration_order() {
        let screen = Screen {
            width: 8,
            height: 8,
        };
        let mk = |color: &str| {
            vec![call(
                "blank_img",
                &[
                    ("width", serde_json::json!("8")),
                    ("height", serde_json::json!("8")),
                    ("color", serde_json::json!(color)),
                ],
            )]
        };
        let ctx = ctx_with_layers(
            vec![layer("red", mk("#ff0000")), layer("blue", mk("#0000ff"))],
            vec![LayerId::from("blue"), LayerId::from("red")],
            screen,
        );

        let out = process_image(&RgbaImage::new(1, 1), &ctx).unwrap().unwrap();
        assert_eq!(out.get_pixel(4, 4).0, [255, 0, 0, 255]);
    }
}
