use crate::record::{ContentKind, Record};

/// How many method exemplars a prompt will carry at most
pub const METHOD_EXEMPLAR_CAP: usize = 2;

/// Compose the slide-outline prompt. Pure function of its inputs, so the same
/// request and retrieval context always produce the same prompt.
pub fn outline_prompt(
  title: &str,
  summary: &str,
  methods: &[Record],
  exemplar: Option<&Record>,
  style: &str,
) -> String {
  let mut prompt = String::new();

  prompt.push_str("You are an experienced conference speaker building a slide deck from a research paper.\n\n");
  push_paper(&mut prompt, title, summary);
  push_exemplars(&mut prompt, "Reference deck frames:", methods);
  push_history(&mut prompt, "One of our previous outlines, for tone:", exemplar);

  prompt.push_str(&format!("Style directive: {style}\n\n"));
  prompt.push_str(
    "Produce a numbered slide outline. Give every slide a short title line and two to four \
     bullet points. Cover motivation, method, key results and takeaways.",
  );

  prompt
}

/// Compose the spoken-script prompt; same shape as the outline prompt with
/// script framing and delivery instructions.
pub fn script_prompt(
  title: &str,
  summary: &str,
  methods: &[Record],
  exemplar: Option<&Record>,
  style: &str,
) -> String {
  let mut prompt = String::new();

  prompt.push_str("You are a science communicator writing a spoken script about a research paper.\n\n");
  push_paper(&mut prompt, title, summary);
  push_exemplars(&mut prompt, "Reference script frames:", methods);
  push_history(&mut prompt, "One of our previous scripts, for tone:", exemplar);

  prompt.push_str(&format!("Style directive: {style}\n\n"));
  prompt.push_str(
    "Produce a complete spoken script: a hook opening, a plain-language walk through the \
     method and results, and a closing takeaway. Mark natural pause points with blank lines.",
  );

  prompt
}

/// Clearly-labeled stand-in used when a backend call fails, so one failed
/// output never sinks the sibling or the whole run.
pub fn placeholder(kind: ContentKind, title: &str, backend: &str) -> String {
  let what = match kind {
    ContentKind::Ppt => "slide outline",
    ContentKind::Speech => "speech script",
  };

  format!(
    "[placeholder - {backend} backend unavailable]\n\
     The {what} for \"{title}\" could not be generated. Re-run once the backend is reachable; \
     the retrieval context will be rebuilt automatically."
  )
}

fn push_paper(prompt: &mut String, title: &str, summary: &str) {
  prompt.push_str(&format!("Paper title: {title}\n\n"));
  prompt.push_str(&format!("Abstract:\n{summary}\n\n"));
}

fn push_exemplars(prompt: &mut String, heading: &str, methods: &[Record]) {
  if methods.is_empty() {
    return;
  }

  prompt.push_str(heading);
  prompt.push('\n');
  for (index, method) in methods.iter().take(METHOD_EXEMPLAR_CAP).enumerate() {
    prompt.push_str(&format!("{}. {}\n{}\n", index + 1, method.title, method.content));
  }
  prompt.push('\n');
}

fn push_history(prompt: &mut String, heading: &str, exemplar: Option<&Record>) {
  if let Some(record) = exemplar {
    prompt.push_str(heading);
    prompt.push('\n');
    prompt.push_str(&record.content);
    prompt.push_str("\n\n");
  }
}
