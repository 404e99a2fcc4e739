use quill::*;

#[test]
fn test_level_functions() {
  // Each level function should handle a plain message without panicking
  verbose("Test verbose message");
  info("Test info message");
  warn("Test warning message");
  error("Test error message");
  debug("Test debug message");
  success("Test success message");
}

#[test]
fn test_multiline_messages() {
  // Every line of a multi-line message gets its own prefix
  let multiline_msg = "First line\nSecond line\nThird line";
  info(multiline_msg);
  warn(multiline_msg);
  error(multiline_msg);
}

#[test]
fn test_event_functions() {
  event_info("Test event info");
  event_warn("Test event warn");
  event_error("Test event error");
  event_success("Test event success");
}

#[test]
fn test_banner_line_length_and_char() {
  assert_eq!(banner_line(5, '='), "=====");
  assert_eq!(banner_line(0, '*'), "");
  assert_eq!(banner_line(3, '~'), "~~~");
}

#[test]
fn test_as_banner_wraps_message() {
  use std::cell::RefCell;

  // Capture through a local sink instead of stderr
  let lines: RefCell<Vec<String>> = RefCell::new(Vec::new());
  as_banner(|msg| lines.borrow_mut().push(msg.to_string()), "middle", 10, '-');

  let lines = lines.into_inner();
  assert_eq!(lines.len(), 3);
  assert_eq!(lines[0], banner_line(10, '-'));
  assert_eq!(lines[1], "middle");
  assert_eq!(lines[2], banner_line(10, '-'));
}

#[test]
fn test_banners() {
  announce("Test announcement");
  flourish("Test flourish");
}

#[test]
fn test_macros() {
  quill::info!("macro info");
  quill::warn!("macro warn");
  quill::error!("macro error");
  quill::debug!("macro debug");
  quill::success!("macro success");
  quill::verbose!("macro verbose");
  quill::event_info!("macro event info");
  quill::event_warn!("macro event warn");
  quill::event_error!("macro event error");
  quill::event_success!("macro event success");
  quill::announce!("macro announce");
  quill::flourish!("macro flourish");
}
