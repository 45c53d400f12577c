//! Line-oriented command shell over a medicine cabinet and a record book.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};

use medtrack_core::expiry::{self, ExpiryStatus};
use medtrack_core::models::{Medicine, Patient, UploadedFile};
use medtrack_core::records::{NameExtractor, NamePrompt, RecordRemoval, UploadOutcome};
use medtrack_core::{prepare_download, MedicineCabinet, RecordBook};

/// One line of shell input.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct Line {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Manage medicines
    #[command(subcommand)]
    Med(MedCommand),

    /// Upload a PNG, JPEG or PDF document
    Upload {
        path: PathBuf,
        /// Attach to this patient (number, id or name) instead of reading the name from the document
        #[arg(long)]
        to: Option<String>,
    },

    /// List patients and their records
    Patients {
        #[arg(long)]
        json: bool,
    },

    /// Delete a patient and all of its records
    RmPatient { patient: String },

    /// Delete a single record
    RmRecord { patient: String, record: String },

    /// Save a record as PDF into a directory
    Download {
        patient: String,
        record: String,
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum MedCommand {
    /// Add a medicine
    Add {
        name: String,
        /// Expiry date as YYYY-MM-DD
        expiry: String,
    },
    /// Show medicines grouped by expiry status
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a medicine (number or id)
    Rm { medicine: String },
    /// Collapse or expand a category
    Toggle { category: Category },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum Category {
    Expired,
    AboutToExpire,
    Safe,
}

impl From<Category> for ExpiryStatus {
    fn from(c: Category) -> Self {
        match c {
            Category::Expired => ExpiryStatus::Expired,
            Category::AboutToExpire => ExpiryStatus::AboutToExpire,
            Category::Safe => ExpiryStatus::Safe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Split a line into words, honoring double quotes.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        bail!("unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Prefix that runs a command while the name prompt is open.
pub const COMMAND_ESCAPE: char = ':';

pub struct Shell<E> {
    cabinet: MedicineCabinet,
    records: RecordBook,
    extractor: E,
}

impl<E: NameExtractor> Shell<E> {
    pub fn new(cabinet: MedicineCabinet, extractor: E) -> Self {
        Self {
            cabinet,
            records: RecordBook::new(),
            extractor,
        }
    }

    pub fn cabinet(&self) -> &MedicineCabinet {
        &self.cabinet
    }

    pub fn records(&self) -> &RecordBook {
        &self.records
    }

    /// Whether the next line answers the patient-name prompt.
    pub fn awaiting_name(&self) -> bool {
        self.records.pending_upload().is_some()
    }

    /// Handle one line of input.
    ///
    /// While a name is pending, plain input answers the prompt and only lines
    /// starting with `:` run as commands.
    pub async fn handle_line(&mut self, line: &str, out: &mut impl Write) -> Result<Flow> {
        let trimmed = line.trim_start();
        let command = match trimmed.strip_prefix(COMMAND_ESCAPE) {
            Some(command) => command,
            None if self.awaiting_name() => {
                self.answer_name_prompt(line, out)?;
                return Ok(Flow::Continue);
            }
            None => trimmed,
        };

        let words = split_line(command)?;
        if words.is_empty() {
            return Ok(Flow::Continue);
        }

        match Line::try_parse_from(&words) {
            Ok(parsed) => self.execute(parsed.command, out).await,
            Err(e) => {
                write!(out, "{e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn execute(&mut self, command: Command, out: &mut impl Write) -> Result<Flow> {
        match command {
            Command::Med(cmd) => self.medicine(cmd, out)?,
            Command::Upload { path, to } => self.upload(path, to, out).await?,
            Command::Patients { json } => self.list_patients(json, out)?,
            Command::RmPatient { patient } => {
                let patient = self.resolve_patient(&patient)?;
                let (id, name) = (patient.id.clone(), patient.name.clone());
                self.records.delete_patient(&id);
                writeln!(out, "Deleted {name} and all records")?;
            }
            Command::RmRecord { patient, record } => {
                let patient = self.resolve_patient(&patient)?;
                let patient_id = patient.id.clone();
                let record_id = resolve_record(patient, &record)?;
                match self.records.delete_record(&patient_id, &record_id) {
                    RecordRemoval::RecordRemoved => writeln!(out, "Record deleted")?,
                    RecordRemoval::PatientRemoved => {
                        writeln!(out, "Record deleted; patient had no records left and was removed")?
                    }
                    RecordRemoval::NotFound => bail!("record not found"),
                }
            }
            Command::Download {
                patient,
                record,
                dir,
            } => {
                let patient = self.resolve_patient(&patient)?;
                let record_id = resolve_record(patient, &record)?;
                let record = patient
                    .record(&record_id)
                    .context("record not found")?;
                let download = prepare_download(record)?;
                let path = download
                    .write_to_dir(&dir)
                    .with_context(|| format!("could not write into {}", dir.display()))?;
                writeln!(out, "Saved {}", path.display())?;
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn medicine(&mut self, command: MedCommand, out: &mut impl Write) -> Result<()> {
        let today = expiry::today();
        match command {
            MedCommand::Add { name, expiry } => {
                let medicine = self.cabinet.add(&name, &expiry)?;
                writeln!(
                    out,
                    "Added {} ({})",
                    medicine.name,
                    medicine.status_on(today)
                )?;
            }
            MedCommand::List { json } => {
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(self.cabinet.medicines())?)?;
                } else {
                    render_medicines(&self.cabinet, today, out)?;
                }
            }
            MedCommand::Rm { medicine } => {
                let id = self.resolve_medicine(&medicine)?;
                self.cabinet.delete(&id);
                writeln!(out, "Medicine deleted")?;
            }
            MedCommand::Toggle { category } => {
                let status = ExpiryStatus::from(category);
                let collapsed = self.cabinet.toggle_collapsed(status);
                let state = if collapsed { "collapsed" } else { "expanded" };
                writeln!(out, "{status} {state}")?;
            }
        }
        Ok(())
    }

    async fn upload(&mut self, path: PathBuf, to: Option<String>, out: &mut impl Write) -> Result<()> {
        let file = UploadedFile::from_path(&path)
            .with_context(|| format!("could not read {}", path.display()))?;

        if let Some(target) = to {
            let patient_id = self.resolve_patient(&target)?.id.clone();
            let attachment = self.records.attach_to_patient(&patient_id, file)?;
            writeln!(out, "Added {} to {}", path.display(), attachment.patient_name)?;
            return Ok(());
        }

        writeln!(out, "Reading patient name from {}...", path.display())?;
        match self.records.upload(file, &self.extractor).await? {
            UploadOutcome::Attached(attachment) => {
                let verb = if attachment.created_patient {
                    "New patient"
                } else {
                    "Added to"
                };
                writeln!(out, "{verb} {}", attachment.patient_name)?;
            }
            UploadOutcome::NeedsPatientName(prompt) => render_name_prompt(&prompt, out)?,
        }
        Ok(())
    }

    fn answer_name_prompt(&mut self, line: &str, out: &mut impl Write) -> Result<()> {
        let name = line.trim();
        if name.is_empty() {
            if let Some(file) = self.records.cancel_pending() {
                writeln!(out, "Upload of {} cancelled", file.file_name)?;
            }
            return Ok(());
        }

        let attachment = self.records.submit_patient_name(name)?;
        let verb = if attachment.created_patient {
            "New patient"
        } else {
            "Added to"
        };
        writeln!(out, "{verb} {}", attachment.patient_name)?;
        Ok(())
    }

    fn list_patients(&self, json: bool, out: &mut impl Write) -> Result<()> {
        if json {
            writeln!(out, "{}", serde_json::to_string_pretty(self.records.patients())?)?;
            return Ok(());
        }

        if self.records.is_empty() {
            writeln!(out, "No Medical Records")?;
            writeln!(out, "Upload a document with: upload <path>")?;
            return Ok(());
        }

        for (i, patient) in self.records.patients().iter().enumerate() {
            render_patient(i + 1, patient, out)?;
        }
        Ok(())
    }

    /// Accepts an id, a patient name, or a list number, in that order.
    fn resolve_patient(&self, token: &str) -> Result<&Patient> {
        let patients = self.records.patients();
        patients
            .iter()
            .find(|p| p.id == token || p.matches_name(token))
            .or_else(|| by_number(patients, token))
            .with_context(|| format!("no patient '{token}'"))
    }

    fn resolve_medicine(&self, token: &str) -> Result<String> {
        let medicines = self.cabinet.medicines();
        by_number(medicines, token)
            .or_else(|| medicines.iter().find(|m| m.id == token))
            .map(|m| m.id.clone())
            .with_context(|| format!("no medicine '{token}'"))
    }
}

fn by_number<'a, T>(items: &'a [T], token: &str) -> Option<&'a T> {
    let n: usize = token.parse().ok()?;
    items.get(n.checked_sub(1)?)
}

fn resolve_record(patient: &Patient, token: &str) -> Result<String> {
    by_number(&patient.records, token)
        .or_else(|| patient.record(token))
        .map(|r| r.id.clone())
        .with_context(|| format!("{} has no record '{token}'", patient.name))
}

/// Render the categorized medicine list.
///
/// Numbers refer to positions in the date-sorted list, which the categories
/// partition in order.
pub fn render_medicines(
    cabinet: &MedicineCabinet,
    today: NaiveDate,
    out: &mut impl Write,
) -> std::io::Result<()> {
    if cabinet.is_empty() {
        writeln!(out, "No Medicines Yet")?;
        writeln!(out, "Add one with: med add <name> <YYYY-MM-DD>")?;
        return Ok(());
    }

    let number_of = |m: &Medicine| {
        cabinet
            .medicines()
            .iter()
            .position(|x| x.id == m.id)
            .map_or(0, |i| i + 1)
    };

    for section in cabinet.sections(today) {
        let marker = if section.collapsed { "+" } else { "-" };
        writeln!(out, "[{marker}] {}", section.title())?;
        if section.collapsed {
            continue;
        }
        for medicine in &section.medicines {
            writeln!(
                out,
                "  {:>2}. {}  (expires {})",
                number_of(medicine),
                medicine.name,
                medicine.display_expiry()
            )?;
        }
    }
    Ok(())
}

fn render_patient(number: usize, patient: &Patient, out: &mut impl Write) -> std::io::Result<()> {
    let plural = if patient.record_count() == 1 { "" } else { "s" };
    writeln!(
        out,
        "{number}. {} ({} record{plural})",
        patient.name,
        patient.record_count()
    )?;
    for (i, record) in patient.records.iter().enumerate() {
        writeln!(
            out,
            "   {}. {}  {}  {}",
            i + 1,
            record.file_name,
            record.mime_type,
            record.uploaded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?;
    }
    Ok(())
}

fn render_name_prompt(prompt: &NamePrompt, out: &mut impl Write) -> std::io::Result<()> {
    if let Some(advisory) = &prompt.advisory {
        writeln!(out, "{advisory}")?;
    }
    writeln!(out, "Could not find a patient name in {}.", prompt.file_name)?;
    if !prompt.suggestions.is_empty() {
        writeln!(out, "Existing patients: {}", prompt.suggestions.join(", "))?;
    }
    writeln!(
        out,
        "Enter patient name (empty line cancels, {COMMAND_ESCAPE}<command> runs a command):"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use medtrack_llm::NameExtraction;
    use std::future::{ready, Future};

    struct Fixed(NameExtraction);

    impl NameExtractor for Fixed {
        fn extract_patient_name(
            &self,
            _file: &UploadedFile,
        ) -> impl Future<Output = NameExtraction> + Send {
            ready(self.0.clone())
        }
    }

    fn shell(extraction: NameExtraction) -> Shell<Fixed> {
        Shell::new(MedicineCabinet::new(), Fixed(extraction))
    }

    async fn run(shell: &mut Shell<Fixed>, line: &str) -> String {
        let mut out = Vec::new();
        shell.handle_line(line, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    fn write_pdf(dir: &tempfile::TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_split_line() {
        assert_eq!(
            split_line(r#"med add "Aspirin 81mg" 2026-12-01"#).unwrap(),
            vec!["med", "add", "Aspirin 81mg", "2026-12-01"]
        );
        assert_eq!(split_line("   ").unwrap(), Vec::<String>::new());
        assert_eq!(split_line(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
        assert!(split_line(r#"med add "oops"#).is_err());
    }

    #[test]
    fn test_parse_commands() {
        let line = Line::try_parse_from(["med", "toggle", "about-to-expire"]).unwrap();
        assert_eq!(
            line.command,
            Command::Med(MedCommand::Toggle {
                category: Category::AboutToExpire
            })
        );

        let line = Line::try_parse_from(["upload", "scan.pdf", "--to", "2"]).unwrap();
        assert_eq!(
            line.command,
            Command::Upload {
                path: PathBuf::from("scan.pdf"),
                to: Some("2".into())
            }
        );

        let line = Line::try_parse_from(["exit"]).unwrap();
        assert_eq!(line.command, Command::Quit);
    }

    #[tokio::test]
    async fn test_empty_states() {
        let mut shell = shell(NameExtraction::NotFound);
        assert!(run(&mut shell, "med list").await.starts_with("No Medicines Yet"));
        assert!(run(&mut shell, "patients").await.starts_with("No Medical Records"));
    }

    #[tokio::test]
    async fn test_medicine_commands() {
        let mut shell = shell(NameExtraction::NotFound);
        run(&mut shell, r#"med add "Vitamin D" 2099-06-01"#).await;
        run(&mut shell, "med add Old 2000-01-01").await;

        let listing = run(&mut shell, "med list").await;
        assert!(listing.contains("[-] Expired (1)"));
        assert!(listing.contains("1. Old  (expires January 1, 2000)"));
        assert!(listing.contains("2. Vitamin D  (expires June 1, 2099)"));

        run(&mut shell, "med toggle safe").await;
        let listing = run(&mut shell, "med list").await;
        assert!(listing.contains("[+] Safe (1)"));
        assert!(!listing.contains("Vitamin D"));

        run(&mut shell, "med rm 1").await;
        assert_eq!(shell.cabinet().len(), 1);
        assert_eq!(shell.cabinet().medicines()[0].name, "Vitamin D");
    }

    #[tokio::test]
    async fn test_invalid_date_is_an_error() {
        let mut shell = shell(NameExtraction::NotFound);
        let mut out = Vec::new();
        let err = shell
            .handle_line("med add Aspirin 12/01/2026", &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
        assert!(shell.cabinet().is_empty());
    }

    #[tokio::test]
    async fn test_upload_with_extracted_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(NameExtraction::Found("Jane Doe".into()));

        let out = run(&mut shell, &format!("upload {}", write_pdf(&dir, "a.pdf"))).await;
        assert!(out.contains("New patient Jane Doe"));

        let out = run(&mut shell, &format!("upload {}", write_pdf(&dir, "b.pdf"))).await;
        assert!(out.contains("Added to Jane Doe"));
        assert_eq!(shell.records().patients()[0].record_count(), 2);
    }

    #[tokio::test]
    async fn test_name_prompt_flow() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(NameExtraction::NotFound);

        let out = run(&mut shell, &format!("upload {}", write_pdf(&dir, "a.pdf"))).await;
        assert!(out.contains("Enter patient name"));
        assert!(shell.awaiting_name());

        // Escaped lines run as commands and leave the prompt open
        let out = run(&mut shell, ":patients").await;
        assert!(out.starts_with("No Medical Records"));
        assert!(shell.awaiting_name());

        let mut sink = Vec::new();
        assert_eq!(shell.handle_line(":quit", &mut sink).await.unwrap(), Flow::Quit);
        assert!(shell.records().is_empty());

        let out = run(&mut shell, "Jane Doe").await;
        assert!(out.contains("New patient Jane Doe"));
        assert!(!shell.awaiting_name());

        run(&mut shell, &format!("upload {}", write_pdf(&dir, "b.pdf"))).await;
        let out = run(&mut shell, "").await;
        assert!(out.contains("cancelled"));
        assert_eq!(shell.records().patients().len(), 1);
    }

    #[tokio::test]
    async fn test_targeted_upload_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(NameExtraction::Found("Max".into()));

        run(&mut shell, &format!("upload {}", write_pdf(&dir, "a.pdf"))).await;
        run(&mut shell, &format!("upload {} --to max", write_pdf(&dir, "b.pdf"))).await;
        assert_eq!(shell.records().patients()[0].record_count(), 2);

        let out = run(&mut shell, &format!("download 1 2 {}", dir.path().display())).await;
        assert!(out.contains("Saved"));
        assert!(dir.path().join("b.pdf").exists());

        let out = run(&mut shell, "rm-record 1 1").await;
        assert_eq!(out.trim(), "Record deleted");
        let out = run(&mut shell, "rm-record 1 1").await;
        assert!(out.contains("was removed"));
        assert!(shell.records().is_empty());
    }

    #[tokio::test]
    async fn test_download_writes_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let mut shell = shell(NameExtraction::Found("Max".into()));

        run(&mut shell, &format!("upload {}", write_pdf(&dir, "letter.pdf"))).await;
        run(&mut shell, &format!("download Max 1 {}", target.path().display())).await;

        let saved = std::fs::read(target.path().join("letter.pdf")).unwrap();
        assert_eq!(saved, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_patient_name_wins_over_list_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(NameExtraction::NotFound);

        run(&mut shell, &format!("upload {}", write_pdf(&dir, "a.pdf"))).await;
        run(&mut shell, "Alice").await;
        run(&mut shell, &format!("upload {}", write_pdf(&dir, "b.pdf"))).await;
        run(&mut shell, "1").await;

        // "1" is the second patient's name, not the first list entry
        run(&mut shell, "rm-patient 1").await;
        let names: Vec<&str> = shell.records().patients().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alice"]);

        // Numbers still work when no name matches
        run(&mut shell, "rm-patient 1").await;
        assert!(shell.records().is_empty());
    }

    #[tokio::test]
    async fn test_quit() {
        let mut shell = shell(NameExtraction::NotFound);
        let mut out = Vec::new();
        assert_eq!(shell.handle_line("quit", &mut out).await.unwrap(), Flow::Quit);
    }
}
