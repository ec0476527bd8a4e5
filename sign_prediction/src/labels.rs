use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

/// Class names indexed by the model's class id.
#[derive(Debug, Clone, Default)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl ClassLabels {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn name(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class {}", class_id))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// One label per line. A trailing `,r,g,b` colour suffix is tolerated
/// and ignored.
pub fn load_labels(filepath: &Path) -> io::Result<ClassLabels> {
    let file = File::open(filepath)?;
    read_labels(io::BufReader::new(file))
}

fn read_labels(reader: impl BufRead) -> io::Result<ClassLabels> {
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.split(',').next().unwrap_or_default().trim();
        if label.is_empty() {
            continue;
        }
        labels.push(label.to_string());
    }

    if labels.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "labels file contains no class names",
        ));
    }

    Ok(ClassLabels::new(labels))
}
