use serial_test::serial;
use tally::*;

#[test]
fn test_basic_logging_functions() {
  info("Test info message");
  warn("Test warning message");
  error("Test error message");
  success("Test success message");
}

#[test]
fn test_multiline_messages() {
  let multiline_msg = "First line\nSecond line\nThird line";
  info(multiline_msg);
  warn(multiline_msg);
  success(multiline_msg);
}

#[test]
fn test_banner_with_collector() {
  let collected = std::cell::RefCell::new(Vec::new());
  as_banner(|line| collected.borrow_mut().push(line.to_string()), "11235.pdf", Some(4), Some('-'));
  assert_eq!(collected.into_inner(), vec!["----", "11235.pdf", "----"]);
}

#[test]
#[serial]
fn test_init_twice_does_not_panic() {
  std::env::remove_var(LOG_ENV);
  init(0);
  init(2);
  flourish("done");
}
