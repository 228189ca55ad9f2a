use screenguard::models::{OcrTokenData, QueryOptions};
use screenguard::services::config_store::DetectorConfig;
use screenguard::services::detection::{classify_text, scan_lines};
use screenguard::services::ocr::{build_lines, find_text_boxes, merge_passes, offset_tokens};
use screenguard::services::providers::ProviderClient;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn parse_offset(raw: &str) -> Result<(i32, i32), String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("expected x,y offset, got '{}'", raw));
    }
    let x = parts[0].trim().parse().map_err(|e| format!("bad offset x: {}", e))?;
    let y = parts[1].trim().parse().map_err(|e| format!("bad offset y: {}", e))?;
    Ok((x, y))
}

fn load_pass(path: &str) -> Result<OcrTokenData, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("read {} failed: {}", path, e))?;
    let pass: OcrTokenData =
        serde_json::from_str(&content).map_err(|e| format!("parse {} failed: {}", path, e))?;
    pass.validate()?;
    Ok(pass)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    screenguard::init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  scan_text <input> [--tokens] [--band <pass.json>] [--band-offset x,y] [--query <text>] [--case-sensitive] [--whole-word] [--raw] [--out <json_path>]\n\nNotes:\n  - <input> is a plain text file, or an OCR token dump (parallel arrays) with --tokens.\n  - --band merges a second ROI pass after shifting it by --band-offset.\n  - --query skips classification and only locates the given text.\n  - --raw converts output boxes to raw-capture space using the configured upscale."
        );
        return Ok(());
    }

    let input = args[1].clone();
    let as_tokens = has_flag(&args, "--tokens");
    let band_path = parse_arg_value(&args, "--band");
    let band_offset = match parse_arg_value(&args, "--band-offset") {
        Some(raw) => Some(parse_offset(&raw)?),
        None => None,
    };
    let query = parse_arg_value(&args, "--query");
    let to_raw = has_flag(&args, "--raw");
    let out_path = parse_arg_value(&args, "--out");

    let config = DetectorConfig::default();
    let client = ProviderClient::new();

    if !as_tokens {
        let text =
            std::fs::read_to_string(&input).map_err(|e| format!("read {} failed: {}", input, e))?;
        let result = classify_text(&text, &config, &client).await;
        println!("Findings: {}", result.findings.len());
        for f in &result.findings {
            println!(
                "  [{:>4},{:>4}) {:<20} conf={:.2} {} ({})",
                f.start,
                f.end,
                f.kind.as_str(),
                f.confidence,
                f.value_preview,
                f.reason
            );
        }
        if let Some(out_path) = out_path {
            let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            std::fs::write(&out_path, json).map_err(|e| format!("write out failed: {}", e))?;
            println!("Wrote JSON: {}", out_path);
        }
        return Ok(());
    }

    let mut pass = load_pass(&input)?;
    if let Some(band_path) = band_path {
        let mut band = load_pass(&band_path)?;
        if let Some(offset) = band_offset {
            offset_tokens(&mut band, offset);
        }
        pass = merge_passes(pass, band);
    }
    println!("OCR tokens: {}", pass.len());

    let lines = build_lines(&pass, config.min_confidence);
    println!("Lines: {}", lines.len());
    for (i, line) in lines.iter().enumerate() {
        println!("{:02}: {}", i + 1, line.text);
    }

    let boxes = if let Some(query) = query {
        let opts = QueryOptions {
            case_sensitive: has_flag(&args, "--case-sensitive"),
            whole_word: has_flag(&args, "--whole-word"),
            min_confidence: config.min_confidence,
        };
        find_text_boxes(&lines, &query, &opts, config.merge_gap_px)
    } else {
        let outcome = scan_lines(&lines, &config, &client).await;
        println!("Findings: {}", outcome.findings.len());
        for f in &outcome.findings {
            println!(
                "  [{:>4},{:>4}) {:<20} conf={:.2} {}",
                f.start,
                f.end,
                f.kind.as_str(),
                f.confidence,
                f.value_preview
            );
        }
        outcome.boxes
    };

    let boxes = if to_raw {
        boxes.to_raw_capture(config.upscale)
    } else {
        boxes
    };

    println!("Boxes ({:?}): {}", boxes.space, boxes.boxes.len());
    for (i, b) in boxes.boxes.iter().enumerate() {
        println!("  #{}: x={}, y={}, w={}, h={}", i + 1, b.x, b.y, b.w, b.h);
    }

    if let Some(out_path) = out_path {
        let json = serde_json::to_string_pretty(&boxes).map_err(|e| e.to_string())?;
        std::fs::write(&out_path, json).map_err(|e| format!("write out failed: {}", e))?;
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
