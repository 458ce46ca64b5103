use decoy_types::config::DecoyConfig;
use decoy_types::error::Result;
use decoy_vfs::{MemoryVfs, Vfs};

const DIRECTORIES: &[&str] = &[
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/home",
    "/lib",
    "/opt",
    "/proc",
    "/root",
    "/sbin",
    "/tmp",
    "/usr/bin",
    "/usr/local/bin",
    "/usr/sbin",
    "/var/log",
    "/var/tmp",
];

/// Lay out a plausible Debian root filesystem for `config`.
pub fn populate_decoy_vfs(vfs: &mut MemoryVfs, config: &DecoyConfig) -> Result<()> {
    for dir in DIRECTORIES {
        vfs.mkdir(dir)?;
    }

    vfs.write("/etc/hostname", format!("{}\n", config.hostname).as_bytes())?;
    vfs.write(
        "/etc/hosts",
        format!(
            "127.0.0.1\tlocalhost\n127.0.1.1\t{}\n\n::1\t\tlocalhost ip6-localhost ip6-loopback\n",
            config.hostname
        )
        .as_bytes(),
    )?;
    vfs.write("/etc/issue", b"Debian GNU/Linux 10 \\n \\l\n\n")?;
    vfs.write(
        "/etc/os-release",
        b"PRETTY_NAME=\"Debian GNU/Linux 10 (buster)\"\nNAME=\"Debian GNU/Linux\"\n\
          VERSION_ID=\"10\"\nVERSION=\"10 (buster)\"\nID=debian\n",
    )?;

    let mut passwd = String::from(
        "root:x:0:0:root:/root:/bin/bash\n\
         daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
         www-data:x:33:33:www-data:/var/www:/usr/sbin/nologin\n",
    );
    if config.default_user != "root" {
        let home = config.home_dir(&config.default_user);
        passwd.push_str(&format!(
            "{user}:x:1000:1000:{user}:{home}:/bin/bash\n",
            user = config.default_user,
        ));
    }
    vfs.write("/etc/passwd", passwd.as_bytes())?;

    let home = config.home_dir(&config.default_user);
    if !vfs.dir_exists(&home)? {
        vfs.mkdir(&home)?;
    }
    vfs.write(
        &format!("{home}/.bashrc"),
        b"# ~/.bashrc: executed by bash(1) for non-login shells.\nexport LS_OPTIONS='--color=auto'\n",
    )?;
    vfs.write(&format!("{home}/.bash_history"), b"")?;
    vfs.write("/var/log/auth.log", b"")?;

    log::debug!("Decoy filesystem holds {} nodes", vfs.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_hostname_and_root_home() {
        let mut vfs = MemoryVfs::new();
        populate_decoy_vfs(&mut vfs, &DecoyConfig::default()).unwrap();
        assert_eq!(vfs.read("/etc/hostname").unwrap(), b"svr04\n");
        assert!(vfs.dir_exists("/usr/local/bin").unwrap());
        assert!(vfs.exists("/root/.bashrc"));
        let passwd = String::from_utf8(vfs.read("/etc/passwd").unwrap()).unwrap();
        assert!(passwd.starts_with("root:x:0:0:"));
    }

    #[test]
    fn non_root_user_gets_account_and_home() {
        let config = DecoyConfig {
            default_user: "admin".to_string(),
            ..DecoyConfig::default()
        };
        let mut vfs = MemoryVfs::new();
        populate_decoy_vfs(&mut vfs, &config).unwrap();
        assert!(vfs.dir_exists("/home/admin").unwrap());
        let passwd = String::from_utf8(vfs.read("/etc/passwd").unwrap()).unwrap();
        assert!(passwd.contains("admin:x:1000:1000:admin:/home/admin:/bin/bash\n"));
    }
}
