//! 生成管理员密码的 argon2 哈希，用于手工写入 `admin_users.password_hash`

fn print_usage_and_exit() -> ! {
    eprintln!("Usage: hash-password <password>");
    std::process::exit(1);
}

fn main() {
    let mut args = std::env::args().skip(1); // 跳过程序名

    let password = args.next().unwrap_or_else(|| {
        eprintln!("Missing <password>");
        print_usage_and_exit();
    });

    if args.next().is_some() {
        eprintln!("Too many arguments provided.");
        print_usage_and_exit();
    }

    if password.is_empty() {
        eprintln!("Password must not be empty.");
        std::process::exit(1);
    }

    match qalam::auth::hash_password(&password) {
        Ok(hash) => println!("{hash}"),
        Err(e) => {
            eprintln!("Failed to hash password: {e}");
            std::process::exit(1);
        }
    }
}
