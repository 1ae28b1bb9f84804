use std::io::{stdout, Write};

/// Single line download bar redrawn in place on stdout.
pub struct TextProgressBar {
    width: usize,
}

impl TextProgressBar {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn line(&self, downloaded: u64, total: Option<u64>, description: &str) -> String {
        match total {
            Some(total) if total > 0 => {
                let ratio = (downloaded as f64 / total as f64).clamp(0.0, 1.0);
                let filled = ((self.width as f64) * ratio) as usize;
                format!(
                    "[{}{}] {:3.0}% - {}",
                    "█".repeat(filled),
                    "░".repeat(self.width - filled),
                    ratio * 100.0,
                    description
                )
            }
            // Unknown size, only the byte count moves
            _ => format!("[{}] {}", "░".repeat(self.width), description),
        }
    }

    pub fn render(&self, downloaded: u64, total: Option<u64>, description: &str) {
        print!("\x1B[2K\r{}", self.line(downloaded, total, description));
        let _ = stdout().flush();
    }

    pub fn finish(&self) {
        println!();
    }
}
