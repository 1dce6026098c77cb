//! SVG compositor.
//!
//! Turns the normalised frame sequence into the final document. Each
//! distinct screen becomes a reusable `<g id="frame_k">` under a
//! `<defs>`; a `<g id="screen_view">` stacks one `<use>` per animation
//! step, each placed one screen height below the previous, and the
//! animation driver scrolls the strip one screen at a time with a
//! stepped transform. The driver is either CSS keyframes or a Web
//! Animations API variable block, per the template contract.
//!
//! Output is deterministic: frame ids follow first appearance, keyframe
//! percentages and script offsets use fixed precision, and attribute
//! order is insertion order.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use svgcast_core::{ScreenSnapshot, Theme};
use xmltree::{Element, XMLNode};

use crate::error::Error;
use crate::layout::layout_screen;
use crate::template::{AnimationKind, FontSpec, Template};
use crate::timing::Frame;

fn fmt_px(value: f64) -> String {
    if (value - value.round()).abs() < 1e-6 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn new_element(name: &str) -> Element {
    Element::new(name)
}

fn set_attr(element: &mut Element, name: &str, value: impl Into<String>) {
    element.attributes.insert(name.to_string(), value.into());
}

/// Build the `<g>` holding one screen's rectangles and text elements.
fn frame_group(
    id: Option<String>,
    snapshot: &ScreenSnapshot,
    cell_w: f64,
    cell_h: f64,
    screen_w: u32,
    screen_h: u32,
) -> Element {
    let mut group = new_element("g");
    if let Some(id) = id {
        set_attr(&mut group, "id", id);
    }

    // Full-viewport backdrop so absent runs show the theme background
    let mut backdrop = new_element("rect");
    set_attr(&mut backdrop, "class", "background");
    set_attr(&mut backdrop, "x", "0");
    set_attr(&mut backdrop, "y", "0");
    set_attr(&mut backdrop, "width", screen_w.to_string());
    set_attr(&mut backdrop, "height", screen_h.to_string());
    group.children.push(XMLNode::Element(backdrop));

    for (row, layout) in layout_screen(snapshot) {
        let y = row as f64 * cell_h;

        for rect in &layout.rects {
            let mut element = new_element("rect");
            set_attr(&mut element, "x", fmt_px(rect.col as f64 * cell_w));
            set_attr(&mut element, "y", fmt_px(y));
            set_attr(&mut element, "width", fmt_px(rect.width_cells as f64 * cell_w));
            set_attr(&mut element, "height", fmt_px(cell_h));
            if let Some(class) = rect.paint.class() {
                set_attr(&mut element, "class", class);
            } else if let Some(fill) = rect.paint.fill() {
                set_attr(&mut element, "fill", fill);
            }
            group.children.push(XMLNode::Element(element));
        }

        for run in &layout.texts {
            let mut element = new_element("text");
            set_attr(&mut element, "x", fmt_px(run.col as f64 * cell_w));
            set_attr(&mut element, "y", fmt_px(y));
            set_attr(
                &mut element,
                "textLength",
                fmt_px(run.width_cells as f64 * cell_w),
            );
            set_attr(&mut element, "lengthAdjust", "spacingAndGlyphs");
            if let Some(class) = run.paint.class() {
                set_attr(&mut element, "class", class);
            } else if let Some(fill) = run.paint.fill() {
                set_attr(&mut element, "fill", fill);
            }
            if run.bold {
                set_attr(&mut element, "font-weight", "bold");
            }
            if run.italic {
                set_attr(&mut element, "font-style", "italic");
            }
            let mut decoration = String::new();
            if run.underline {
                decoration.push_str("underline");
            }
            if run.strikethrough {
                if !decoration.is_empty() {
                    decoration.push(' ');
                }
                decoration.push_str("line-through");
            }
            if !decoration.is_empty() {
                set_attr(&mut element, "text-decoration", decoration);
            }
            element.children.push(XMLNode::Text(run.text.clone()));
            group.children.push(XMLNode::Element(element));
        }
    }

    group
}

fn font_css(font: &FontSpec) -> String {
    format!(
        "#screen {{\n  font-family: '{}', monospace;\n  font-style: normal;\n  font-size: {}px;\n}}\n\
         text {{\n  dominant-baseline: text-before-edge;\n}}\n",
        font.family, font.size
    )
}

fn theme_css(theme: &Theme) -> String {
    let mut css = String::new();
    css.push_str(&format!(
        ".foreground {{fill: {};}}\n.background {{fill: {};}}\n",
        theme.foreground.to_hex(),
        theme.background.to_hex()
    ));
    for (index, color) in theme.palette.iter().enumerate() {
        css.push_str(&format!(".color{} {{fill: {};}}\n", index, color.to_hex()));
    }
    css
}

/// Cumulative start offset of each step, as a fraction of the loop
fn step_offsets(frames: &[Frame], loop_ms: u64) -> Vec<f64> {
    let total = loop_ms.max(1) as f64;
    let mut offsets = Vec::with_capacity(frames.len());
    let mut elapsed = 0u64;
    for frame in frames {
        offsets.push(elapsed as f64 / total);
        elapsed += frame.duration_ms;
    }
    offsets
}

fn keyframes_css(frames: &[Frame], loop_ms: u64, screen_h: u32) -> String {
    let offsets = step_offsets(frames, loop_ms);
    let mut css = String::from("@keyframes roll {\n");
    for (step, offset) in offsets.iter().enumerate() {
        css.push_str(&format!(
            "  {:.3}% {{transform: translateY(-{}px);}}\n",
            offset * 100.0,
            step as u64 * screen_h as u64
        ));
    }
    let last = frames.len().saturating_sub(1) as u64;
    css.push_str(&format!(
        "  100.000% {{transform: translateY(-{}px);}}\n}}\n",
        last * screen_h as u64
    ));
    css.push_str(
        "#screen_view {\n  animation: roll var(--animation-duration) steps(1, end) infinite;\n}\n",
    );
    css
}

fn waapi_script(frames: &[Frame], loop_ms: u64, screen_h: u32) -> String {
    let offsets = step_offsets(frames, loop_ms);
    let count = frames.len();
    let mut entries = Vec::with_capacity(count);
    for (step, offset) in offsets.iter().enumerate() {
        let transform = format!("translateY(-{}px)", step as u64 * screen_h as u64);
        // First and last keyframes let the engine pin them to 0 and 1
        let entry = if step == 0 || step == count - 1 {
            format!(
                "        {{\"transform\": \"{}\", \"easing\": \"steps(1, end)\"}}",
                transform
            )
        } else {
            format!(
                "        {{\"transform\": \"{}\", \"easing\": \"steps(1, end)\", \"offset\": {:.3}}}",
                transform, offset
            )
        };
        entries.push(entry);
    }
    format!(
        "var termtosvg_vars = {{\n    transforms: [\n{}\n    ],\n    timings: {{\"duration\": {}, \"iterations\": Infinity}}\n}};",
        entries.join(",\n"),
        loop_ms
    )
}

/// Populate the template's slots with the animated frame sequence.
/// Only the screen, the generated style and (for waapi) the generated
/// script are touched; the rest of the template passes through as-is.
pub fn compose_animation(
    template: &mut Template,
    frames: &[Frame],
    loop_ms: u64,
    theme: Option<&Theme>,
) -> Result<(), Error> {
    if frames.is_empty() {
        return Err(Error::EmptyCast);
    }

    let cell_w = template.cell_width;
    let cell_h = template.cell_height;
    let screen_w = template.screen_width;
    let screen_h = template.screen_height;
    let animation = template.animation;
    let font = template.font.clone();

    // Frame library: one definition per distinct screen, ids in order of
    // first appearance; steps reference definitions.
    let mut defs = new_element("defs");
    let mut frame_ids: HashMap<Arc<ScreenSnapshot>, usize> = HashMap::new();
    let mut steps: Vec<usize> = Vec::with_capacity(frames.len());
    for frame in frames {
        let next_id = frame_ids.len();
        let id = *frame_ids.entry(Arc::clone(&frame.screen)).or_insert(next_id);
        if id == next_id {
            let group = frame_group(
                Some(format!("frame_{}", id)),
                &frame.screen,
                cell_w,
                cell_h,
                screen_w,
                screen_h,
            );
            defs.children.push(XMLNode::Element(group));
        }
        steps.push(id);
    }

    let mut screen_view = new_element("g");
    set_attr(&mut screen_view, "id", "screen_view");
    for (step, id) in steps.iter().enumerate() {
        let mut use_tag = new_element("use");
        use_tag
            .attributes
            .insert("xlink:href".to_string(), format!("#frame_{}", id));
        set_attr(&mut use_tag, "y", (step as u64 * screen_h as u64).to_string());
        screen_view.children.push(XMLNode::Element(use_tag));
    }

    let screen = template.screen_mut();
    screen.children.clear();
    screen.children.push(XMLNode::Element(defs));
    screen.children.push(XMLNode::Element(screen_view));

    let mut css = format!(":root {{\n  --animation-duration: {}ms;\n}}\n", loop_ms);
    css.push_str(&font_css(&font));
    if let Some(theme) = theme {
        css.push_str(&theme_css(theme));
    }
    match animation {
        AnimationKind::Css => {
            css.push_str(&keyframes_css(frames, loop_ms, screen_h));
        }
        AnimationKind::Waapi => {
            let script = waapi_script(frames, loop_ms, screen_h);
            let slot = template
                .generated_script_mut()
                .expect("validated waapi template has a script slot");
            slot.children.clear();
            slot.children.push(XMLNode::CData(script));
        }
        AnimationKind::None => {}
    }

    let style = template.generated_style_mut();
    style.children.clear();
    style.children.push(XMLNode::CData(css));

    Ok(())
}

/// Populate a template with a single static frame: no frame stack, no
/// keyframes, no script.
pub fn compose_still(
    template: &mut Template,
    snapshot: &ScreenSnapshot,
    theme: Option<&Theme>,
) -> Result<(), Error> {
    let cell_w = template.cell_width;
    let cell_h = template.cell_height;
    let screen_w = template.screen_width;
    let screen_h = template.screen_height;
    let font = template.font.clone();

    let group = frame_group(None, snapshot, cell_w, cell_h, screen_w, screen_h);
    let screen = template.screen_mut();
    screen.children.clear();
    screen.children.push(XMLNode::Element(group));

    let mut css = font_css(&font);
    if let Some(theme) = theme {
        css.push_str(&theme_css(theme));
    }
    let style = template.generated_style_mut();
    style.children.clear();
    style.children.push(XMLNode::CData(css));

    if let Some(slot) = template.generated_script_mut() {
        slot.children.clear();
    }

    Ok(())
}

/// Serialize the document to `path` atomically: write a sibling temp
/// file, then rename. A failed render never leaves partial output.
pub fn write_svg_file(template: &Template, path: &Path) -> Result<(), Error> {
    let svg = template.to_svg_string().map_err(Error::Template)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix("termtosvg_")
        .rand_bytes(6)
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;
    tmp.write_all(svg.as_bytes())
        .map_err(|e| Error::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| Error::io(path, e.error))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Emit one SVG per frame, named `<stem>_<k>.svg` in `dir`.
pub fn write_still_frames(
    template: &Template,
    frames: &[Frame],
    theme: Option<&Theme>,
    dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, Error> {
    if frames.is_empty() {
        return Err(Error::EmptyCast);
    }
    let mut paths = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let mut still = template.clone();
        compose_still(&mut still, &frame.screen, theme)?;
        let path = dir.join(format!("{}_{}.svg", stem, index));
        write_svg_file(&still, &path)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;
    use svgcast_core::Screen;

    fn template_named(name: &str) -> Template {
        Template::parse(templates::builtin(name).unwrap()).unwrap()
    }

    fn frame_of(text: &str, duration_ms: u64) -> Frame {
        let mut screen = Screen::new(80, 24);
        for c in text.chars() {
            screen.put_char(c);
        }
        Frame {
            screen: Arc::new(screen.snapshot()),
            duration_ms,
        }
    }

    #[test]
    fn test_css_animation_smoke() {
        let mut template = template_named("gjm8");
        let frames = vec![frame_of("hi", 1000)];
        compose_animation(&mut template, &frames, 1000, None).unwrap();
        let svg = template.to_svg_string().unwrap();

        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("id=\"frame_0\""));
        assert!(svg.contains("xlink:href=\"#frame_0\""));
        assert!(svg.contains("--animation-duration: 1000ms"));
        assert!(svg.contains("@keyframes roll"));
        assert!(svg.contains("steps(1, end) infinite"));
        assert!(svg.contains("hi"));
        assert!(svg.contains("dominant-baseline: text-before-edge"));
    }

    #[test]
    fn test_frames_dedup_in_defs() {
        let mut template = template_named("gjm8");
        let shared = frame_of("x", 100);
        let frames = vec![
            shared.clone(),
            frame_of("y", 100),
            Frame {
                screen: Arc::clone(&shared.screen),
                duration_ms: 100,
            },
        ];
        compose_animation(&mut template, &frames, 300, None).unwrap();
        let svg = template.to_svg_string().unwrap();

        // Two distinct screens, three steps
        assert_eq!(svg.matches("<g id=\"frame_").count(), 2);
        assert_eq!(svg.matches("<use ").count(), 3);
        // The third step references the first frame again
        assert_eq!(svg.matches("xlink:href=\"#frame_0\"").count(), 2);
    }

    #[test]
    fn test_steps_stack_below_each_other() {
        let mut template = template_named("gjm8");
        let frames = vec![frame_of("a", 100), frame_of("b", 100)];
        compose_animation(&mut template, &frames, 200, None).unwrap();
        let svg = template.to_svg_string().unwrap();
        assert!(svg.contains("y=\"0\""));
        assert!(svg.contains("y=\"408\""));
        assert!(svg.contains("translateY(-408px)"));
    }

    #[test]
    fn test_waapi_script() {
        let mut template = template_named("window_frame_js");
        let frames = vec![frame_of("a", 100), frame_of("b", 200), frame_of("c", 700)];
        compose_animation(&mut template, &frames, 1000, None).unwrap();
        let svg = template.to_svg_string().unwrap();

        assert!(svg.contains("var termtosvg_vars"));
        assert_eq!(svg.matches("\"transform\":").count(), 3);
        // Only the middle entry carries an offset
        assert_eq!(svg.matches("\"offset\":").count(), 1);
        assert!(svg.contains("\"offset\": 0.100"));
        assert!(svg.contains("\"duration\": 1000"));
        assert!(svg.contains("\"iterations\": Infinity"));
        // No CSS keyframes in waapi mode
        assert!(!svg.contains("@keyframes"));
    }

    #[test]
    fn test_template_chrome_preserved() {
        let mut template = template_named("window_frame");
        let frames = vec![frame_of("hi", 1000)];
        compose_animation(&mut template, &frames, 1000, None).unwrap();
        let svg = template.to_svg_string().unwrap();
        assert!(svg.contains("id=\"window-chrome\""));
        assert!(svg.contains(".color1 {fill: #cf6a4c;}"));
    }

    #[test]
    fn test_theme_overrides_palette() {
        let mut template = template_named("gjm8");
        let theme = Theme::from_strings(
            "#101010",
            "#fefefe",
            "#000000:#cd0000:#00cd00:#cdcd00:#0000ee:#cd00cd:#00cdcd:#e5e5e5",
        )
        .unwrap();
        let frames = vec![frame_of("hi", 1000)];
        compose_animation(&mut template, &frames, 1000, Some(&theme)).unwrap();
        let svg = template.to_svg_string().unwrap();
        assert!(svg.contains(".foreground {fill: #101010;}"));
        assert!(svg.contains(".color7 {fill: #e5e5e5;}"));
    }

    #[test]
    fn test_still_has_no_animation() {
        let mut template = template_named("gjm8");
        let frame = frame_of("hi", 1000);
        compose_still(&mut template, &frame.screen, None).unwrap();
        let svg = template.to_svg_string().unwrap();

        assert!(svg.contains("hi"));
        assert!(!svg.contains("@keyframes"));
        assert!(!svg.contains("<use"));
        assert!(!svg.contains("termtosvg_vars"));
    }

    #[test]
    fn test_still_frame_files() {
        let dir = tempfile::tempdir().unwrap();
        let template = template_named("gjm8");
        let frames = vec![frame_of("a", 100), frame_of("b", 100), frame_of("c", 100)];
        let paths =
            write_still_frames(&template, &frames, None, dir.path(), "session").unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("session_0.svg"));
        assert!(paths[2].ends_with("session_2.svg"));
        for path in &paths {
            let content = std::fs::read_to_string(path).unwrap();
            assert!(content.starts_with("<?xml"));
            assert!(content.contains("id=\"terminal\""));
        }
    }

    #[test]
    fn test_deterministic_output() {
        let build = || {
            let mut template = template_named("gjm8");
            let frames = vec![frame_of("abc", 500), frame_of("abcd", 500)];
            compose_animation(&mut template, &frames, 1000, None).unwrap();
            template.to_svg_string().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_loop_duration_consistency() {
        // CSS custom property and WAAPI duration agree on the loop
        let frames = vec![frame_of("a", 123), frame_of("b", 877)];
        let loop_ms = 1000;

        let mut css_template = template_named("gjm8");
        compose_animation(&mut css_template, &frames, loop_ms, None).unwrap();
        let css_svg = css_template.to_svg_string().unwrap();
        assert!(css_svg.contains("--animation-duration: 1000ms"));

        let mut js_template = template_named("window_frame_js");
        compose_animation(&mut js_template, &frames, loop_ms, None).unwrap();
        let js_svg = js_template.to_svg_string().unwrap();
        assert!(js_svg.contains("\"duration\": 1000"));
    }
}
