//! Shipped configuration templates.
//!
//! Placeholders are `@name@`. A placeholder alone on a line expands to one
//! line per item at that line's indentation, or disappears when the set is
//! empty.

use super::{Fill, ParamKind, ParamSpec, Template};

const HOSTNAME: ParamSpec = ParamSpec {
    name: "hostname",
    kind: ParamKind::Hostname,
    description: "networking.hostName (defaults to this machine's hostname)",
    fill: Fill::SystemHostname,
};

const USERNAME: ParamSpec = ParamSpec {
    name: "username",
    kind: ParamKind::Username,
    description: "Login name of the primary user",
    fill: Fill::Default("nixos"),
};

const TIMEZONE: ParamSpec = ParamSpec {
    name: "timezone",
    kind: ParamKind::Timezone,
    description: "time.timeZone, e.g. Europe/Berlin",
    fill: Fill::Default("UTC"),
};

const LOCALE: ParamSpec = ParamSpec {
    name: "locale",
    kind: ParamKind::Locale,
    description: "i18n.defaultLocale",
    fill: Fill::Default("en_US.UTF-8"),
};

const STATE_VERSION: ParamSpec = ParamSpec {
    name: "state_version",
    kind: ParamKind::StateVersion,
    description: "system.stateVersion of the first install, e.g. 24.05",
    fill: Fill::Required,
};

const fn packages(defaults: &'static str) -> ParamSpec {
    ParamSpec {
        name: "packages",
        kind: ParamKind::Packages,
        description: "Extra packages, comma or space separated",
        fill: Fill::Set(defaults),
    }
}

const fn services(defaults: &'static str) -> ParamSpec {
    ParamSpec {
        name: "services",
        kind: ParamKind::Services,
        description: "Services to enable, comma or space separated",
        fill: Fill::Set(defaults),
    }
}

const MINIMAL_PARAMS: &[ParamSpec] = &[HOSTNAME, TIMEZONE, LOCALE, STATE_VERSION, packages("vim git"), services("")];

const DESKTOP_PARAMS: &[ParamSpec] = &[
    HOSTNAME,
    USERNAME,
    TIMEZONE,
    LOCALE,
    STATE_VERSION,
    packages("firefox vim git"),
    services("printing"),
];

const SERVER_PARAMS: &[ParamSpec] = &[
    HOSTNAME,
    USERNAME,
    TIMEZONE,
    LOCALE,
    STATE_VERSION,
    packages("vim git htop tmux"),
    services("fail2ban"),
];

const MINIMAL: &str = r#"{ config, pkgs, ... }:

{
  imports = [
    ./hardware-configuration.nix
  ];

  boot.loader.systemd-boot.enable = true;
  boot.loader.efi.canTouchEfiVariables = true;

  networking.hostName = @hostname@;

  time.timeZone = @timezone@;
  i18n.defaultLocale = @locale@;

  environment.systemPackages = with pkgs; [
    @packages@
  ];

  @services@

  system.stateVersion = @state_version@;
}
"#;

const DESKTOP: &str = r#"{ config, pkgs, ... }:

{
  imports = [
    ./hardware-configuration.nix
  ];

  boot.loader.systemd-boot.enable = true;
  boot.loader.efi.canTouchEfiVariables = true;

  networking.hostName = @hostname@;
  networking.networkmanager.enable = true;

  time.timeZone = @timezone@;
  i18n.defaultLocale = @locale@;

  services.xserver.enable = true;
  services.xserver.displayManager.gdm.enable = true;
  services.xserver.desktopManager.gnome.enable = true;

  services.pipewire = {
    enable = true;
    alsa.enable = true;
    pulse.enable = true;
  };

  users.users.@username@ = {
    isNormalUser = true;
    extraGroups = [ "wheel" "networkmanager" ];
  };

  environment.systemPackages = with pkgs; [
    @packages@
  ];

  @services@

  system.stateVersion = @state_version@;
}
"#;

const SERVER: &str = r#"{ config, pkgs, ... }:

{
  imports = [
    ./hardware-configuration.nix
  ];

  boot.loader.grub.enable = true;

  networking.hostName = @hostname@;
  networking.firewall.enable = true;
  networking.firewall.allowedTCPPorts = [ 22 ];

  time.timeZone = @timezone@;
  i18n.defaultLocale = @locale@;

  services.openssh = {
    enable = true;
    settings.PermitRootLogin = "no";
    settings.PasswordAuthentication = false;
  };

  users.users.@username@ = {
    isNormalUser = true;
    extraGroups = [ "wheel" ];
  };

  environment.systemPackages = with pkgs; [
    @packages@
  ];

  @services@

  system.stateVersion = @state_version@;
}
"#;

pub(super) const TEMPLATES: &[Template] = &[
    Template {
        id: "minimal",
        description: "Bootable base system with networking and a package list",
        params: MINIMAL_PARAMS,
        provides: &[],
        body: MINIMAL,
    },
    Template {
        id: "desktop",
        description: "GNOME workstation with PipeWire audio and one user",
        params: DESKTOP_PARAMS,
        provides: &["xserver", "pipewire"],
        body: DESKTOP,
    },
    Template {
        id: "server",
        description: "Headless host with hardened SSH and a firewall",
        params: SERVER_PARAMS,
        provides: &["openssh"],
        body: SERVER,
    },
];
