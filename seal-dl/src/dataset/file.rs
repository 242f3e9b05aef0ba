//! The JSON dataset file format.

use super::DetectionDataset;
use crate::{
    common::*,
    record::{Category, ImageRecord, Target},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetFile {
    classes: Vec<String>,
    images: Vec<ImageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageEntry {
    id: String,
    file: PathBuf,
    category: Category,
    #[serde(default)]
    evaluated: Option<u64>,
    #[serde(default)]
    instances: Vec<InstanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstanceEntry {
    label: usize,
    /// `[xmin, ymin, xmax, ymax]` in pixels.
    bbox: [f64; 4],
}

impl DetectionDataset {
    /// Load a dataset file. Relative image paths are resolved against the
    /// directory of the dataset file.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset file '{}'", path.display()))?;
        let DatasetFile { classes, images } = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse dataset file '{}'", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let records: Vec<_> = images
            .into_iter()
            .map(|entry| -> Result<_> {
                let ImageEntry {
                    id,
                    file,
                    category,
                    evaluated,
                    instances,
                } = entry;

                let (bbox, label): (Vec<_>, Vec<_>) = instances
                    .into_iter()
                    .map(|InstanceEntry { label, bbox }| (bbox, label))
                    .unzip();
                if let Some(&label) = label.iter().find(|&&label| label >= classes.len()) {
                    bail!(
                        "image '{}' has label {}, but there are only {} classes",
                        id,
                        label,
                        classes.len()
                    );
                }
                let target = Target::from_parts(&bbox, &label)
                    .with_context(|| format!("invalid annotation of image '{}'", id))?;

                Ok(ImageRecord {
                    file: base_dir.join(file),
                    id,
                    category,
                    evaluated,
                    target,
                })
            })
            .collect::<Result<_>>()?;

        let dataset = Self::from_records(records, classes)
            .with_context(|| format!("invalid dataset file '{}'", path.display()))?;
        info!(
            "loaded {} images of {} classes from '{}'",
            dataset.len(),
            dataset.classes().len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Save to a dataset file. Image paths under the directory of the file
    /// are stored relative to it.
    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let images: Vec<_> = self
            .all_images()
            .into_iter()
            .map(|record| {
                let ImageRecord {
                    id,
                    file,
                    category,
                    evaluated,
                    target,
                } = record;
                let file = match file.strip_prefix(base_dir) {
                    Ok(relative) if !base_dir.as_os_str().is_empty() => relative.to_owned(),
                    _ => file,
                };
                let instances = target
                    .instances()
                    .iter()
                    .map(|instance| InstanceEntry {
                        label: instance.class,
                        bbox: instance.rect.xyxy(),
                    })
                    .collect();

                ImageEntry {
                    id,
                    file,
                    category,
                    evaluated,
                    instances,
                }
            })
            .collect();

        let file = DatasetFile {
            classes: self.classes().to_vec(),
            images,
        };
        let text = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write dataset file '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "classes": ["seal", "pup"],
        "images": [
            { "id": "a", "file": "a.jpg", "category": "train", "evaluated": null,
              "instances": [ { "label": 0, "bbox": [1, 2, 5, 8] },
                             { "label": 1, "bbox": [3, 3, 4, 4] } ] },
            { "id": "b", "file": "/data/b.jpg", "category": "new", "evaluated": 3 }
        ]
    }"#;

    fn write(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("dataset.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn load_dataset_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let dataset = DetectionDataset::load(write(dir.path(), DATASET))?;

        assert_eq!(dataset.classes(), &["seal", "pup"]);
        let a = dataset.get("a").unwrap();
        assert_eq!(a.file, dir.path().join("a.jpg"));
        assert_eq!(a.category, Category::Train);
        assert_eq!(a.target.bbox(), vec![[1.0, 2.0, 5.0, 8.0], [3.0, 3.0, 4.0, 4.0]]);
        assert_eq!(a.target.label(), vec![0, 1]);

        let b = dataset.get("b").unwrap();
        assert_eq!(b.file, Path::new("/data/b.jpg"));
        assert_eq!(b.evaluated, Some(3));
        assert!(b.target.is_empty());
        Ok(())
    }

    #[test]
    fn save_then_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let dataset = DetectionDataset::load(write(dir.path(), DATASET))?;

        let path = dir.path().join("saved.json");
        dataset.save(&path)?;
        assert!(std::fs::read_to_string(&path)?.contains("\"a.jpg\""));
        assert_eq!(DetectionDataset::load(&path)?, dataset);
        Ok(())
    }

    #[test]
    fn invalid_files_are_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cases = [
            // inverted box
            r#"{ "classes": ["seal"], "images": [ { "id": "a", "file": "a.jpg",
                 "category": "train", "instances": [ { "label": 0, "bbox": [5, 2, 1, 8] } ] } ] }"#,
            // unknown label
            r#"{ "classes": ["seal"], "images": [ { "id": "a", "file": "a.jpg",
                 "category": "train", "instances": [ { "label": 1, "bbox": [1, 2, 5, 8] } ] } ] }"#,
            // duplicated id
            r#"{ "classes": [], "images": [ { "id": "a", "file": "a.jpg", "category": "train" },
                                            { "id": "a", "file": "b.jpg", "category": "test" } ] }"#,
            // unknown category
            r#"{ "classes": [], "images": [ { "id": "a", "file": "a.jpg", "category": "other" } ] }"#,
        ];

        for text in cases {
            assert!(DetectionDataset::load(write(dir.path(), text)).is_err());
        }
        Ok(())
    }
}
