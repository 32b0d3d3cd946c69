//! `duetlink file-info`: metadata of the file being printed.

use duetlink_core::{ControllerConfig, FileInfo};

use crate::cli::GlobalOpts;
use crate::commands;
use crate::error::CliError;
use crate::output;

pub async fn handle(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let info = commands::oneshot(config, |controller| async move {
        controller.request_file_info().await
    })
    .await?;

    let out = output::render_single(global.output, &info, detail, |i| {
        i.file_name.clone().unwrap_or_default()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(info: &FileInfo) -> String {
    let mut pairs: Vec<(&str, String)> = vec![(
        "File",
        info.file_name.clone().unwrap_or_else(|| "-".into()),
    )];
    if let Some(size) = info.size {
        pairs.push(("Size", format!("{size} bytes")));
    }
    pairs.push(("Height", format!("{:.2} mm", info.height)));
    pairs.push(("Layer height", format!("{:.2} mm", info.layer_height)));
    if info.first_layer_height > 0.0 {
        pairs.push(("First layer", format!("{:.2} mm", info.first_layer_height)));
    }
    if let Some(layers) = info.layer_count(info.first_layer_height) {
        pairs.push(("Layers", layers.to_string()));
    }
    if !info.filament.is_empty() {
        pairs.push(("Filament", format!("{:.1} mm", info.total_filament())));
    }
    if let Some(ref generator) = info.generated_by {
        pairs.push(("Generated by", generator.clone()));
    }
    output::detail_lines(&pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_shows_layers_and_filament() {
        let info = FileInfo {
            file_name: Some("0:/gcodes/cube.gcode".into()),
            height: 10.0,
            layer_height: 0.2,
            filament: vec![100.0, 23.5],
            ..FileInfo::default()
        };
        let text = detail(&info);
        assert!(text.contains("cube.gcode"));
        assert!(text.contains("Layers: 50"));
        assert!(text.contains("123.5 mm"));
    }
}
