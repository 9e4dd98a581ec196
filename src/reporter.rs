use crate::events::Event;

/// Reporter aggregates events and produces human or JSON output.
pub struct Reporter {
    events: Vec<Event>,
    json_mode: bool,
    #[cfg(feature = "cli")]
    spinner: Option<indicatif::ProgressBar>,
}

impl Reporter {
    pub fn new(json_mode: bool) -> Self {
        Self {
            events: Vec::new(),
            json_mode,
            #[cfg(feature = "cli")]
            spinner: None,
        }
    }

    pub fn record(&mut self, event: Event) {
        if self.json_mode {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{}", line);
            }
        } else {
            self.render(&event);
        }
        self.events.push(event);
    }

    /// Closure form for APIs taking an [`Observer`](crate::events::Observer).
    pub fn observer(&mut self) -> impl FnMut(Event) + '_ {
        move |event| self.record(event)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn render(&mut self, event: &Event) {
        match event {
            Event::ScanCompleted { root, files, projects } => {
                println!("scanned {}: {files} loose files, {projects} projects", root.display());
            }
            Event::EnrichStarted { candidates } => self.start_spinner(*candidates),
            Event::NamingFailed { op_id, error } => {
                self.suspend(|| eprintln!("warning: no name for {op_id}: {error}"));
            }
            Event::OpRenamed { from, to, .. } => {
                self.finish_spinner();
                println!("renamed {} -> {}", from.display(), to.display());
            }
            Event::EnrichCompleted { changed } => {
                self.finish_spinner();
                println!("{changed} destinations renamed");
            }
            Event::OpPlanned {
                op_type,
                source,
                destination,
                ..
            } => match source {
                Some(src) => println!("would {op_type}: {} -> {}", src.display(), destination.display()),
                None => println!("would {op_type}: {}", destination.display()),
            },
            Event::OpFailed { op_id, error } => eprintln!("error: {op_id}: {error}"),
            Event::BatchCommitted { operations, .. } => println!("applied {operations} operations"),
            Event::BatchRolledBack { .. } => eprintln!("apply failed, changes rolled back"),
            Event::UndoCompleted { batch_id } => println!("undid batch {batch_id}"),
            _ => {}
        }
    }

    #[cfg(feature = "cli")]
    fn start_spinner(&mut self, candidates: usize) {
        let spinner = indicatif::ProgressBar::new_spinner();
        spinner.set_message(format!("asking for names of {candidates} projects"));
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    #[cfg(not(feature = "cli"))]
    fn start_spinner(&mut self, candidates: usize) {
        eprintln!("asking for names of {candidates} projects...");
    }

    #[cfg(feature = "cli")]
    fn finish_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    #[cfg(not(feature = "cli"))]
    fn finish_spinner(&mut self) {}

    #[cfg(feature = "cli")]
    fn suspend(&self, f: impl FnOnce()) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        }
    }

    #[cfg(not(feature = "cli"))]
    fn suspend(&self, f: impl FnOnce()) {
        f()
    }

    pub fn summary(&self) -> String {
        let count = |pred: fn(&Event) -> bool| self.events.iter().filter(|&e| pred(e)).count();
        let renamed = count(|e| matches!(e, Event::OpRenamed { .. }));
        let failed = count(|e| matches!(e, Event::OpFailed { .. } | Event::NamingFailed { .. }));
        format!(
            "{} events recorded ({renamed} renamed, {failed} failures)",
            self.events.len()
        )
    }
}
