use serial_test::serial;
use std::fs;
use tempfile::TempDir;

use customui::commands::{check, compile};
use customui::config::{self, CONFIG_FILE};

#[test]
#[serial]
fn test_compile_uses_config_variables() {
    let temp_dir = TempDir::new().unwrap();
    std::env::set_current_dir(temp_dir.path()).unwrap();

    fs::write(
        CONFIG_FILE,
        "[variables]\nTitle = \"From config\"\nGold = \"10\"\n",
    )
    .unwrap();
    fs::write(
        "shop.html",
        "<script type=\"text/customui\">\n@Title = \"Default\";\n</script>\n<span>@Title @Gold</span>",
    )
    .unwrap();

    let config = config::load_config(CONFIG_FILE.as_ref()).unwrap();
    let output = temp_dir.path().join("shop.ui");
    compile::execute(
        "shop.html".as_ref(),
        &[("Gold".to_string(), "99".to_string())],
        Some(&output),
        &config,
    )
    .unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Label { Text: \"From config 99\"; }\n"
    );
}

#[test]
#[serial]
fn test_compile_reports_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    std::env::set_current_dir(temp_dir.path()).unwrap();

    let config = config::load_config(CONFIG_FILE.as_ref()).unwrap();
    let err = compile::execute("nope.html".as_ref(), &[], None, &config).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("nope.html"), "{}", message);
}

#[test]
#[serial]
fn test_check_current_directory() {
    let temp_dir = TempDir::new().unwrap();
    std::env::set_current_dir(temp_dir.path()).unwrap();

    fs::create_dir_all("ui/shop").unwrap();
    fs::write("ui/menu.html", "<div><span>ok</span></div>").unwrap();
    fs::write("ui/shop/slot.cui", "<$C.ItemSlot />").unwrap();
    fs::write("notes.txt", "<table>").unwrap();

    let config = config::load_config(CONFIG_FILE.as_ref()).unwrap();
    assert!(check::execute(".".as_ref(), &config).is_ok());

    fs::write("ui/broken.html", "<div style=\"float: left\"></div>").unwrap();
    assert!(check::execute(".".as_ref(), &config).is_err());
}
