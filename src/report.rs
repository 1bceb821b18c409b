//! Run output: `reports/<start time>/` holding `result.txt`, `pics/` and an
//! `index.html` gallery of every captured frame.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const GALLERY_HEADER: &str = r#"<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<style>
html{background-color: #141414}
p{text-align: center;color: white;font-family: monospace;}
img{cursor: pointer;border: 2px solid #707070;}
img:hover {border: 2px solid white;}
div.gallery img {width: 100%;height: auto;}
*{box-sizing: border-box;}
.responsive {padding: 6px 6px;float: left;width: 25%;}
@media only screen and (max-width: 700px){.responsive {width: 50%;margin: 1px 0;}}
@media only screen and (max-width: 500px){.responsive {width: 100%;}}
</style>
</head><body>
<script>window.onload = function () {
var totalNumberOfImages = document.querySelectorAll("div.responsive").length;
document.getElementById("total").innerHTML = ":: Total images: " + totalNumberOfImages + " ::";};
function f(img){
navigator.clipboard.writeText(img.alt);}
</script>
<p id="total"></p>
<p>:: With Javascript enabled: Click on the image to get the corresponding RTSP link ::</p>

"#;

/// Runs started within the same second get `-1`, `-2`, ... suffixes up to this.
const MAX_SAME_SECOND_RUNS: u32 = 100;

/// Where kept screenshots go. Each (image, url) pair is handed over once.
pub trait ResultSink: Send + Sync {
    fn append(&self, image: &Path, url: &str) -> Result<()>;
}

pub struct Report {
    root: PathBuf,
    pics: PathBuf,
    result_file: PathBuf,
    html_file: PathBuf,
    // Serializes result.txt and index.html appends as one unit.
    write_lock: Mutex<()>,
}

impl Report {
    /// New report folder under `<base>/reports/`, named after the current local time.
    /// An existing folder is never reused.
    pub fn create(base: &Path) -> Result<Self> {
        let reports = base.join("reports");
        fs::create_dir_all(&reports)
            .with_context(|| format!("Failed to create {}", reports.display()))?;

        let stamp = Local::now().format("%Y.%m.%d-%H.%M.%S").to_string();
        for n in 0..MAX_SAME_SECOND_RUNS {
            let root = match n {
                0 => reports.join(&stamp),
                n => reports.join(format!("{}-{}", stamp, n)),
            };
            match fs::create_dir(&root) {
                Ok(()) => return Self::populate(root),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e).with_context(|| format!("Failed to create {}", root.display())),
            }
        }
        Err(anyhow!("Too many report folders named {} in {}", stamp, reports.display()))
    }

    /// New report folder at exactly `root`. Fails if it already exists.
    pub fn create_at(root: PathBuf) -> Result<Self> {
        if let Some(parent) = root.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::create_dir(&root).with_context(|| format!("Failed to create {}", root.display()))?;
        Self::populate(root)
    }

    fn populate(root: PathBuf) -> Result<Self> {
        let pics = root.join("pics");
        fs::create_dir(&pics).with_context(|| format!("Failed to create {}", pics.display()))?;
        tracing::debug!("Creating {}", pics.display());

        let result_file = root.join("result.txt");
        fs::write(&result_file, "")
            .with_context(|| format!("Failed to create {}", result_file.display()))?;

        let html_file = root.join("index.html");
        let title = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<title>{}</title>\n{}",
            html_escape(&title),
            GALLERY_HEADER
        );
        fs::write(&html_file, html)
            .with_context(|| format!("Failed to create {}", html_file.display()))?;
        tracing::debug!("Generating {}", html_file.display());

        Ok(Self {
            root,
            pics,
            result_file,
            html_file,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pics_dir(&self) -> &Path {
        &self.pics
    }

    pub fn debug_log_path(&self) -> PathBuf {
        self.root.join("debug.log")
    }

    pub fn result_file(&self) -> &Path {
        &self.result_file
    }

    pub fn html_file(&self) -> &Path {
        &self.html_file
    }

    fn gallery_tile(&self, image: &Path, url: &str) -> String {
        let dir = image
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pics".to_string());
        let file = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "<div class=\"responsive\"><div class=\"gallery\">\n\
             <img src=\"{}/{}\" alt=\"{}\" width=\"600\" height=\"400\" onclick=\"f(this)\"></div></div>\n\n",
            html_escape(&dir),
            html_escape(&file),
            html_escape(url)
        )
    }
}

impl ResultSink for Report {
    fn append(&self, image: &Path, url: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut results = OpenOptions::new()
            .append(true)
            .open(&self.result_file)
            .with_context(|| format!("Failed to open {}", self.result_file.display()))?;
        writeln!(results, "{}", url)?;

        if image.exists() {
            let mut html = OpenOptions::new()
                .append(true)
                .open(&self.html_file)
                .with_context(|| format!("Failed to open {}", self.html_file.display()))?;
            html.write_all(self.gallery_tile(image, url).as_bytes())?;
        }
        Ok(())
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
