use crate::config::Config;
use crate::models::opportunity::RankedSnapshot;
use tracing::info;
use colored::*;
use figlet_rs::FIGfont;

pub fn print_config(config: &Config) {
    let json = serde_json::to_string_pretty(config).unwrap_or_default();

    info!("\n{}: \n{}", String::from("[CONFIG]").blue().underline(), json.magenta());
}

fn banner(text: &str) {
    let figure = FIGfont::standard().ok().and_then(|font| font.convert(text).map(|f| f.to_string()));
    match figure {
        Some(figure) => info!("\n{}", figure),
        None => info!("{}", text),
    }
}

pub fn print_app_starting() {
    banner("KTA is starting...");
}

pub fn print_app_started() {
    banner("KTA is STARTED!!!");
}

/// Render the top `top` entries at or above `min_value` as a table
pub fn render_opportunities(snapshot: &RankedSnapshot, top: usize, min_value: f64) -> String {
    let mut out = format!(
        "{} {} ({} profitable)\n",
        String::from("[OPPORTUNITIES]").blue().underline(),
        snapshot.generated_at.format("%H:%M:%S%.3f"),
        snapshot.len()
    );

    let mut shown = 0;
    for entry in snapshot.at_least(min_value).take(top) {
        let value = format!("{:>8.3}%", entry.value);
        out.push_str(&format!("{:>4}. {}  {}\n", entry.rank, value.green().bold(), entry.description));
        shown += 1;
    }

    if shown == 0 {
        out.push_str(&format!("{}\n", "no triangles above threshold".yellow()));
    }

    out
}

pub fn print_opportunities(snapshot: &RankedSnapshot, top: usize, min_value: f64) {
    println!("{}", render_opportunities(snapshot, top, min_value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::opportunity::RankedEntry;
    use chrono::Utc;

    #[test]
    fn table_respects_limit_and_threshold() {
        colored::control::set_override(false);

        let snapshot = RankedSnapshot {
            generated_at: Utc::now(),
            entries: vec![
                RankedEntry { rank: 1, description: "first".into(), value: 0.9 },
                RankedEntry { rank: 2, description: "second".into(), value: 0.4 },
                RankedEntry { rank: 3, description: "third".into(), value: 0.1 }
            ],
        };

        let table = render_opportunities(&snapshot, 1, 0.0);
        assert!(table.contains("first"));
        assert!(table.contains("   0.900%"));
        assert!(!table.contains("second"));

        let table = render_opportunities(&snapshot, 10, 0.3);
        assert!(table.contains("second"));
        assert!(!table.contains("third"));

        let table = render_opportunities(&snapshot, 10, 5.0);
        assert!(table.contains("no triangles above threshold"));
    }
}
